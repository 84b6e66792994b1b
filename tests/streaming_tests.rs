use bytes::Bytes;
use futures_util::StreamExt;

use regdelta::client::{AnalyzeTransport, MockAnalyze};
use regdelta::streaming::drive;
use regdelta::{ChangeEvent, ChangeRecord, ChangeSink, RawByteStream, StreamError, StreamSummary};

fn byte_stream(chunks: Vec<Result<Bytes, StreamError>>) -> RawByteStream {
    Box::pin(futures_util::stream::iter(chunks))
}

fn chunked(payload: &str, chunk_size: usize) -> RawByteStream {
    let chunks: Vec<Result<Bytes, StreamError>> = payload
        .as_bytes()
        .chunks(chunk_size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    byte_stream(chunks)
}

#[derive(Default)]
struct RecordingSink {
    records: Vec<ChangeRecord>,
    completed: Option<StreamSummary>,
    errors: Vec<String>,
}

impl ChangeSink for RecordingSink {
    fn on_change(&mut self, record: ChangeRecord) {
        self.records.push(record);
    }
    fn on_complete(&mut self, summary: StreamSummary) {
        self.completed = Some(summary);
    }
    fn on_error(&mut self, error: &StreamError) {
        self.errors.push(error.to_string());
    }
}

#[tokio::test]
async fn stream_changes_emits_records_then_done() {
    let payload = "{\"changes\":[{\"section\":\"1.1\",\"change_type\":\"Modified\"},{\"section\":\"1.2\",\"change_type\":\"Added\"}]}";
    let mut events = Box::pin(regdelta::stream_changes(chunked(payload, 7)));

    let mut sections = Vec::new();
    let mut done = None;
    while let Some(event) = events.next().await {
        match event.expect("no stream error expected") {
            ChangeEvent::Change(record) => sections.push(record.section.unwrap()),
            ChangeEvent::Done(summary) => done = Some(summary),
        }
    }
    assert_eq!(sections, vec!["1.1", "1.2"]);
    let done = done.expect("terminal event");
    assert_eq!(done.records, 2);
    assert!(!done.truncated);
}

#[tokio::test]
async fn multi_byte_utf8_split_across_chunks() {
    let payload = "{\"changes\":[{\"section\":\"\u{00a7}1.2\",\"change_type\":\"Modified\"}]}";
    let bytes = payload.as_bytes();
    // Split inside the two-byte section-sign character.
    let cut = payload.find('\u{00a7}').unwrap() + 1;
    let stream = byte_stream(vec![
        Ok(Bytes::copy_from_slice(&bytes[..cut])),
        Ok(Bytes::copy_from_slice(&bytes[cut..])),
    ]);

    let mut sink = RecordingSink::default();
    let summary = drive(stream, &mut sink).await.expect("clean stream");
    assert_eq!(summary.records, 1);
    assert_eq!(sink.records[0].section.as_deref(), Some("\u{00a7}1.2"));
}

#[tokio::test]
async fn one_byte_chunks_match_single_chunk_decode() {
    let payload = "{\"changes\": [ {\"section\":\"3\",\"old\":\"a, {b}\",\"new\":\"c \\\"d\\\"\"} ]}";

    let mut whole = RecordingSink::default();
    drive(chunked(payload, payload.len()), &mut whole)
        .await
        .expect("clean stream");

    let mut split = RecordingSink::default();
    drive(chunked(payload, 1), &mut split)
        .await
        .expect("clean stream");

    assert_eq!(whole.records, split.records);
    assert_eq!(whole.completed, split.completed);
}

#[tokio::test]
async fn transport_error_keeps_already_dispatched_records() {
    let stream = byte_stream(vec![
        Ok(Bytes::from_static(b"{\"changes\":[{\"section\":\"1\"},")),
        Err(StreamError::Transport("connection reset".to_string())),
    ]);

    let mut sink = RecordingSink::default();
    let result = drive(stream, &mut sink).await;
    assert!(result.is_err());
    assert_eq!(sink.records.len(), 1);
    assert_eq!(sink.records[0].section.as_deref(), Some("1"));
    assert!(sink.completed.is_none());
    assert_eq!(sink.errors.len(), 1);
    assert!(sink.errors[0].contains("connection reset"));
}

#[tokio::test]
async fn invalid_utf8_is_a_stream_error() {
    let stream = byte_stream(vec![
        Ok(Bytes::from_static(b"{\"changes\":[")),
        Ok(Bytes::from_static(&[0xff, 0xfe])),
    ]);

    let mut sink = RecordingSink::default();
    let result = drive(stream, &mut sink).await;
    assert!(matches!(result, Err(StreamError::Utf8 { .. })));
}

#[tokio::test]
async fn empty_stream_completes_with_zero_changes() {
    let mut sink = RecordingSink::default();
    let summary = drive(byte_stream(Vec::new()), &mut sink)
        .await
        .expect("clean stream");
    assert_eq!(summary.records, 0);
    assert!(sink.records.is_empty());
    assert!(sink.completed.is_some());
}

#[tokio::test]
async fn mock_transport_round_trip() {
    let payload = "{\"changes\":[{\"section\":\"4.2\",\"change_type\":\"Removed\",\"change_summary\":\"section dropped\"}]}";
    let transport = MockAnalyze::new(payload, 5);
    let stream = transport
        .analyze("old text".to_string(), "new text".to_string())
        .await
        .expect("mock stream");

    let mut sink = RecordingSink::default();
    let summary = drive(stream, &mut sink).await.expect("clean stream");
    assert_eq!(summary.records, 1);
    assert_eq!(
        sink.records[0].change_summary.as_deref(),
        Some("section dropped")
    );
}
