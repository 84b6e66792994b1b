use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::record::ChangeRecord;
use crate::scanner::{extract_objects, find_wrapper_end};

/// Driver state: the wrapper is stripped exactly once, and once the array
/// closes everything else on the wire is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    AwaitingWrapper,
    Extracting,
    Done,
}

/// Terminal report for one decoded stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Records dispatched. Zero is valid and meaningful: no changes detected.
    pub records: usize,
    /// Extracted spans that were not valid JSON (dropped, stream continued).
    pub parse_failures: usize,
    /// The stream ended with an incomplete trailing object still buffered.
    /// The partial data is dropped, never dispatched.
    pub truncated: bool,
}

/// Incremental decoder for one `{"changes":[...]}` response stream.
///
/// One instance per analysis request: the buffer and wrapper flag are
/// request-local, so concurrent requests each construct their own decoder and
/// never share state. Feed decoded text chunks of any size (zero-length
/// included) as they arrive; each call returns the records whose closing
/// brace arrived in that chunk, in stream order. Call [`finish`] when the
/// transport signals completion.
///
/// [`finish`]: ChangeStreamDecoder::finish
#[derive(Debug)]
pub struct ChangeStreamDecoder {
    buffer: String,
    state: DecoderState,
    records: usize,
    parse_failures: usize,
}

impl Default for ChangeStreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeStreamDecoder {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            state: DecoderState::AwaitingWrapper,
            records: 0,
            parse_failures: 0,
        }
    }

    /// Append one chunk and return every record completed by it.
    #[instrument(target = "regdelta::decoder", skip(self, chunk), fields(chunk_len = chunk.len()))]
    pub fn feed(&mut self, chunk: &str) -> Vec<ChangeRecord> {
        if self.state == DecoderState::Done {
            return Vec::new();
        }
        self.buffer.push_str(chunk);

        if self.state == DecoderState::AwaitingWrapper {
            match find_wrapper_end(&self.buffer) {
                Some(end) => {
                    self.buffer = self.buffer.split_off(end);
                    self.state = DecoderState::Extracting;
                    debug!(target: "regdelta::decoder", "wrapper stripped");
                }
                // Retry on the next chunk; absence now proves nothing.
                None => return Vec::new(),
            }
        }

        let extraction = extract_objects(&self.buffer);
        self.buffer = extraction.remainder;
        if extraction.array_closed {
            self.state = DecoderState::Done;
        }

        let mut out = Vec::with_capacity(extraction.objects.len());
        for text in &extraction.objects {
            if let Some(record) = self.decode_fragment(text) {
                self.records += 1;
                out.push(record);
            }
        }
        out
    }

    /// Parse one extracted span. Invalid JSON and unusable objects are
    /// dropped here; neither ever aborts the stream.
    fn decode_fragment(&mut self, text: &str) -> Option<ChangeRecord> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(error) => {
                warn!(
                    target: "regdelta::decoder",
                    %error,
                    fragment_len = text.len(),
                    "dropping fragment that is not valid JSON"
                );
                self.parse_failures += 1;
                return None;
            }
        };
        if !value.is_object() {
            debug!(target: "regdelta::decoder", "dropping non-object fragment");
            return None;
        }
        let record: ChangeRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(error) => {
                warn!(
                    target: "regdelta::decoder",
                    %error,
                    "dropping object with mistyped fields"
                );
                self.parse_failures += 1;
                return None;
            }
        };
        if !record.is_identified() {
            debug!(
                target: "regdelta::decoder",
                "dropping object with no identifying fields"
            );
            return None;
        }
        Some(record)
    }

    /// Transition to `Done` and report totals. A wrapper that never appeared
    /// is a zero-change stream, not an error.
    #[instrument(target = "regdelta::decoder", skip(self))]
    pub fn finish(&mut self) -> StreamSummary {
        let truncated =
            self.state == DecoderState::Extracting && !self.buffer.trim().is_empty();
        if truncated {
            warn!(
                target: "regdelta::decoder",
                pending_len = self.buffer.len(),
                "stream ended with an incomplete trailing object; dropping it"
            );
        }
        if self.state == DecoderState::AwaitingWrapper && !self.buffer.is_empty() {
            debug!(
                target: "regdelta::decoder",
                "stream ended before the changes wrapper appeared; treating as zero changes"
            );
        }
        self.state = DecoderState::Done;
        self.buffer.clear();
        StreamSummary {
            records: self.records,
            parse_failures: self.parse_failures,
            truncated,
        }
    }

    /// Records dispatched so far.
    pub fn records(&self) -> usize {
        self.records
    }
}
