use async_stream::stream;
use bytes::Bytes;
use futures_core::stream::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use tracing::warn;

use crate::decoder::{ChangeStreamDecoder, StreamSummary};
use crate::error::StreamError;
use crate::record::ChangeRecord;

/// Raw byte stream from the transport (an HTTP response body, a mock, a file).
pub type RawByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Event emitted while decoding one analysis stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// One decoded record, in stream order.
    Change(ChangeRecord),
    /// Clean end of stream; emitted exactly once, after the last record.
    Done(StreamSummary),
}

/// Presentation boundary. The decoder core knows nothing about rendering;
/// whatever displays the records implements this and gets called in stream
/// order, then exactly one terminal notification.
pub trait ChangeSink {
    fn on_change(&mut self, record: ChangeRecord);
    fn on_complete(&mut self, summary: StreamSummary);
    fn on_error(&mut self, error: &StreamError);
}

/// Incremental UTF-8 decoder that carries a partial multi-byte sequence from
/// the tail of one chunk into the head of the next instead of mis-decoding it.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
    offset: usize,
}

impl Utf8Carry {
    /// Decode as much of `pending + bytes` as is valid UTF-8, holding back an
    /// incomplete trailing sequence. Bytes that can never begin a valid
    /// sequence are a stream-level error.
    pub fn push(&mut self, bytes: &[u8]) -> Result<String, StreamError> {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.offset += self.pending.len();
                self.pending.clear();
                Ok(text)
            }
            Err(error) => {
                if error.error_len().is_some() {
                    return Err(StreamError::Utf8 {
                        offset: self.offset + error.valid_up_to(),
                    });
                }
                let valid = error.valid_up_to();
                // The prefix is known valid, so this conversion is exact.
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                self.offset += valid;
                Ok(text)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Decode a `{"changes":[...]}` byte stream into [`ChangeEvent`]s.
///
/// Records are yielded as soon as their closing brace arrives, regardless of
/// how the transport chunked the bytes. A transport error ends the stream
/// with `Err(..)`; records already yielded before it remain valid. Dropping
/// the stream cancels decoding with no partial dispatch.
pub fn stream_changes(
    byte_stream: RawByteStream,
) -> impl Stream<Item = Result<ChangeEvent, StreamError>> {
    stream! {
        let mut decoder = ChangeStreamDecoder::new();
        let mut carry = Utf8Carry::default();
        let mut byte_stream = byte_stream;

        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(bytes) => {
                    let text = match carry.push(&bytes) {
                        Ok(text) => text,
                        Err(error) => {
                            yield Err(error);
                            return;
                        }
                    };
                    for record in decoder.feed(&text) {
                        yield Ok(ChangeEvent::Change(record));
                    }
                }
                Err(error) => {
                    yield Err(error);
                    return;
                }
            }
        }

        if !carry.is_empty() {
            warn!(
                target: "regdelta::decoder",
                "stream ended inside a multi-byte UTF-8 sequence"
            );
        }
        yield Ok(ChangeEvent::Done(decoder.finish()));
    }
}

/// Drive one stream to completion against a sink. Returns the summary on a
/// clean end; on transport failure the sink sees `on_error` and the error is
/// returned (records already delivered are not retracted).
pub async fn drive<S: ChangeSink>(
    byte_stream: RawByteStream,
    sink: &mut S,
) -> Result<StreamSummary, StreamError> {
    let mut events = Box::pin(stream_changes(byte_stream));
    let mut summary = StreamSummary::default();
    while let Some(event) = events.next().await {
        match event {
            Ok(ChangeEvent::Change(record)) => sink.on_change(record),
            Ok(ChangeEvent::Done(done)) => summary = done,
            Err(error) => {
                sink.on_error(&error);
                return Err(error);
            }
        }
    }
    sink.on_complete(summary.clone());
    Ok(summary)
}
