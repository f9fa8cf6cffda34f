//! Upload sink contract (write path used by the publisher)

use async_trait::async_trait;

use crate::error::{CoreError, Result};

/// File handed to an upload sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Content-addressed storage that accepts uploads and returns `ipfs://` URIs
#[async_trait]
pub trait UploadSink: Send + Sync {
    async fn upload_file(&self, file: UploadFile) -> Result<String>;

    async fn upload_json(&self, document: &serde_json::Value) -> Result<String>;
}

/// Sink for read-only deployments. Every upload is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledUploadSink;

#[async_trait]
impl UploadSink for DisabledUploadSink {
    async fn upload_file(&self, file: UploadFile) -> Result<String> {
        Err(CoreError::Unsupported(format!("upload of {} (no upload sink)", file.name)))
    }

    async fn upload_json(&self, _document: &serde_json::Value) -> Result<String> {
        Err(CoreError::Unsupported("metadata upload (no upload sink)".to_string()))
    }
}
