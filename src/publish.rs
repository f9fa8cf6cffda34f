//! Metadata publishing
//!
//! Validates a draft, uploads its image and then the canonical metadata
//! document through the injected [`UploadSink`], and checks that the sink
//! answered with a usable content address. Only one publish runs at a time.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::gateway::{ContentAddress, ContentMetadata};
use crate::guard::{FlightState, SingleFlight};
use crate::traits::{UploadFile, UploadSink};

/// Longest accepted title, in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// Unsubmitted record metadata
#[derive(Debug, Clone, Default)]
pub struct MetadataDraft {
    pub title: String,
    pub description: String,
    pub source_url: String,
    pub author: String,
    pub image: Option<UploadFile>,
}

impl MetadataDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = source_url.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_image(mut self, image: UploadFile) -> Self {
        self.image = Some(image);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CoreError::Validation("title is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(CoreError::Validation(format!(
                "title exceeds {} characters",
                MAX_TITLE_CHARS
            )));
        }

        let source = self.source_url.trim();
        if !source.is_empty() && !(source.starts_with("http://") || source.starts_with("https://")) {
            return Err(CoreError::Validation(format!(
                "source URL must be http(s): {}",
                source
            )));
        }

        Ok(())
    }
}

/// Result of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMetadata {
    /// Content-address URI of the metadata document, as returned by the sink
    pub metadata_uri: String,
    pub address: ContentAddress,
    pub image_uri: Option<String>,
}

/// Uploads record metadata through an injected sink
pub struct MetadataPublisher {
    sink: Arc<dyn UploadSink>,
    flight: SingleFlight,
}

impl MetadataPublisher {
    pub fn new(sink: Arc<dyn UploadSink>) -> Self {
        Self {
            sink,
            flight: SingleFlight::new("publish"),
        }
    }

    pub fn is_publishing(&self) -> bool {
        self.flight.state() == FlightState::InFlight
    }

    /// Validate and upload a draft.
    ///
    /// Fails with [`CoreError::Busy`] while another publish is running.
    pub async fn publish(&self, draft: MetadataDraft) -> Result<PublishedMetadata> {
        draft.validate()?;
        let _permit = self.flight.try_acquire()?;

        let image_uri = match draft.image {
            Some(file) => {
                debug!(name = %file.name, bytes = file.bytes.len(), "Uploading image");
                let uri = self.sink.upload_file(file).await?;
                ContentAddress::parse(&uri)?;
                Some(uri)
            }
            None => None,
        };

        let author = draft.author.trim();
        let metadata = ContentMetadata {
            name: Some(draft.title.trim().to_string()),
            description: draft.description,
            source_url: draft.source_url.trim().to_string(),
            image: image_uri.clone().unwrap_or_default(),
            author: (!author.is_empty()).then(|| author.to_string()),
            attributes: Vec::new(),
        };

        let metadata_uri = self.sink.upload_json(&metadata.to_document()).await?;
        let address = ContentAddress::parse(&metadata_uri)?;

        info!(uri = %metadata_uri, "Metadata published");

        Ok(PublishedMetadata {
            metadata_uri,
            address,
            image_uri,
        })
    }
}
