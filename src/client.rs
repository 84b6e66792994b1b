use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::error::StreamError;
use crate::streaming::RawByteStream;

/// Configuration for the analysis service client.
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            // Classification of a large document can take a while; the body
            // streams the whole time, so this bounds the full response.
            timeout: Duration::from_secs(300),
        }
    }
}

/// Transport boundary for submitting two document versions and obtaining the
/// response byte stream. The decoder core only ever sees the stream.
#[async_trait]
pub trait AnalyzeTransport: Send + Sync {
    async fn analyze(&self, old_doc: String, new_doc: String) -> Result<RawByteStream, StreamError>;
}

/// HTTP client for the analysis service.
#[derive(Debug, Clone)]
pub struct AnalyzeClient {
    config: AnalyzeConfig,
    client: Client,
}

impl AnalyzeClient {
    pub fn new(config: AnalyzeConfig) -> Self {
        info!(base_url = %config.base_url, "creating analyze client");
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl AnalyzeTransport for AnalyzeClient {
    #[instrument(skip(self, old_doc, new_doc), fields(old_len = old_doc.len(), new_len = new_doc.len()))]
    async fn analyze(&self, old_doc: String, new_doc: String) -> Result<RawByteStream, StreamError> {
        let form = Form::new()
            .part("file_v1", Part::text(old_doc).file_name("file_v1.txt"))
            .part("file_v2", Part::text(new_doc).file_name("file_v2.txt"));

        debug!("posting documents to analysis endpoint");
        let response = self
            .client
            .post(format!("{}/api/analyze", self.config.base_url))
            .multipart(form)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "analyze request failed");
                StreamError::Http(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            error!(status = %status, body = %body, "analysis service returned an error");
            return Err(StreamError::Http(format!("{}: {}", status, body)));
        }

        debug!(status = %status, "analysis stream open");
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamError::Transport(e.to_string())));
        Ok(Box::pin(stream))
    }
}

/// Canned transport that replays a fixed payload in fixed-size chunks.
/// Useful in tests and for exercising consumers without a backend.
#[derive(Debug, Clone)]
pub struct MockAnalyze {
    payload: String,
    chunk_size: usize,
}

impl MockAnalyze {
    pub fn new(payload: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            payload: payload.into(),
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait]
impl AnalyzeTransport for MockAnalyze {
    async fn analyze(
        &self,
        _old_doc: String,
        _new_doc: String,
    ) -> Result<RawByteStream, StreamError> {
        let chunks: Vec<Result<Bytes, StreamError>> = self
            .payload
            .as_bytes()
            .chunks(self.chunk_size)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }
}
