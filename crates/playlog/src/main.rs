use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod config;
mod plays;
mod reader;
mod track;

use config::TrackerConfig;
use plays::PlaysAction;
use track::TrackArgs;

#[derive(Parser, Debug)]
#[command(
    name = "playlog",
    about = "Reconstructs osu! play sessions from a live snapshot stream",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to the snapshot endpoint and record plays until interrupted
    Track(TrackArgs),

    /// Browse and manage recorded plays
    Plays {
        /// Config file (default: <config_dir>/playlog/playlog.toml)
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        /// Play store file (overrides config)
        #[arg(long, global = true)]
        store: Option<PathBuf>,

        #[command(subcommand)]
        action: PlaysAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Track(args) => track::run(args).await,
        Commands::Plays {
            config,
            store,
            action,
        } => {
            let store_path = match store {
                Some(path) => Some(path),
                None => TrackerConfig::load(config.as_deref())?.store_path,
            };
            plays::handle_plays_command(action, store_path)
        }
    }
}
