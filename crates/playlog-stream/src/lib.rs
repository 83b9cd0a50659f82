//! Stream adapter: connects to the snapshot endpoint and hands every parsed
//! snapshot to the tracker through a single ordered channel.

mod error;
mod policy;
mod stream;

pub use error::StreamError;
pub use policy::ReconnectPolicy;
pub use stream::SnapshotStream;
