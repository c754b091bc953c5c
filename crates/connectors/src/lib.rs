pub mod auth;
pub mod error;
pub mod retry;
pub mod sink;
pub mod source;

pub use error::{SinkError, SourceError};
pub use sink::SinkClient;
pub use source::SourceClient;
