use thiserror::Error;

/// Stream-level failures surfaced to the consumer.
///
/// Per-fragment problems (an extracted span that is not valid JSON, or a
/// decoded object with no identifying fields) are intentionally *not* part of
/// this taxonomy: they are logged, counted in the stream summary, and never
/// interrupt decoding of subsequent records.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("invalid UTF-8 in response stream at byte {offset}")]
    Utf8 { offset: usize },
}
