use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("Snapshot stream read failed: {0}")]
    Read(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Snapshot receiver dropped")]
    ChannelClosed,
}
