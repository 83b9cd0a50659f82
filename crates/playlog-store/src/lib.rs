pub mod store;
pub mod types;

pub use store::JsonPlayStore;
pub use types::PlayFilter;
