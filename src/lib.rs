pub mod client;
pub mod decoder;
pub mod diff;
pub mod error;
pub mod record;
pub mod scanner;
pub mod streaming;

// Convenient re-exports
pub use decoder::{ChangeStreamDecoder, StreamSummary};
pub use error::StreamError;
pub use record::ChangeRecord;
pub use streaming::{drive, stream_changes, ChangeEvent, ChangeSink, RawByteStream};
