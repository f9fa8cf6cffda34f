//! Metadata schema migration
//!
//! Metadata documents have been written in several shapes over time. Each
//! known shape has its own typed struct and an explicit conversion into the
//! canonical [`ContentMetadata`]. Anything unrecognized becomes the empty
//! default; fields are never guessed across shapes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Current schema version written by the publisher
pub const CURRENT_SCHEMA_VERSION: u64 = 3;

/// Canonical metadata shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub name: Option<String>,
    pub description: String,
    pub source_url: String,
    /// Image reference as written (often `ipfs://`)
    pub image: String,
    pub author: Option<String>,
    pub attributes: Vec<MetadataAttribute>,
}

impl ContentMetadata {
    /// Whether nothing useful was resolved
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Serialize in the current schema
    pub fn to_document(&self) -> Value {
        let doc = EvermarkMetadata {
            schema_version: CURRENT_SCHEMA_VERSION,
            name: self.name.clone(),
            description: Some(self.description.clone()),
            source_url: Some(self.source_url.clone()),
            image: Some(self.image.clone()),
            author: self.author.clone(),
            attributes: self.attributes.clone(),
        };
        serde_json::to_value(doc).unwrap_or(Value::Null)
    }
}

/// ERC-721 style trait. `trait_type` is optional in that standard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trait_type: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// Keep the attributes that parse; a malformed entry never rejects the document
fn lenient_attributes<'de, D>(deserializer: D) -> Result<Vec<MetadataAttribute>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(attribute) => Some(attribute),
            Err(e) => {
                debug!(error = %e, "Skipping malformed metadata attribute");
                None
            }
        })
        .collect())
}

/// Known document shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// v1: `desc`, `sourceUrl`/`source`, `image`
    Legacy,
    /// v2: `name`, `description`, `external_url`, `image`, `attributes`
    Erc721,
    /// v3: `schemaVersion`, `description`, `sourceUrl`, `image`, `author`
    Evermark,
    Unknown,
}

impl SchemaVersion {
    fn from_number(n: u64) -> Self {
        match n {
            1 => SchemaVersion::Legacy,
            2 => SchemaVersion::Erc721,
            3 => SchemaVersion::Evermark,
            _ => SchemaVersion::Unknown,
        }
    }

    /// Identify the shape of a raw document.
    ///
    /// An explicit numeric `schemaVersion` (or `version`) wins; otherwise
    /// discriminating keys are checked in a fixed order.
    pub fn detect(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return SchemaVersion::Unknown;
        };

        if let Some(n) = obj
            .get("schemaVersion")
            .or_else(|| obj.get("version"))
            .and_then(Value::as_u64)
        {
            return Self::from_number(n);
        }

        let has = |key: &str| obj.contains_key(key);

        if has("desc") {
            SchemaVersion::Legacy
        } else if has("external_url") || has("attributes") {
            SchemaVersion::Erc721
        } else if has("sourceUrl") && has("description") {
            SchemaVersion::Evermark
        } else if has("sourceUrl") || has("source") {
            SchemaVersion::Legacy
        } else if has("description") || has("image") || has("name") {
            SchemaVersion::Erc721
        } else {
            SchemaVersion::Unknown
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Erc721Metadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    external_url: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default, deserialize_with = "lenient_attributes")]
    attributes: Vec<MetadataAttribute>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvermarkMetadata {
    #[serde(default)]
    schema_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_attributes",
        skip_serializing_if = "Vec::is_empty"
    )]
    attributes: Vec<MetadataAttribute>,
}

impl From<LegacyMetadata> for ContentMetadata {
    fn from(doc: LegacyMetadata) -> Self {
        ContentMetadata {
            name: doc.title,
            description: doc.desc.unwrap_or_default(),
            source_url: doc.source_url.or(doc.source).unwrap_or_default(),
            image: doc.image.unwrap_or_default(),
            author: doc.author,
            attributes: Vec::new(),
        }
    }
}

impl From<Erc721Metadata> for ContentMetadata {
    fn from(doc: Erc721Metadata) -> Self {
        let author = trait_string(&doc.attributes, "author");
        let source_url = doc
            .external_url
            .or_else(|| trait_string(&doc.attributes, "source_url"))
            .unwrap_or_default();

        ContentMetadata {
            name: doc.name,
            description: doc.description.unwrap_or_default(),
            source_url,
            image: doc.image.unwrap_or_default(),
            author,
            attributes: doc.attributes,
        }
    }
}

impl From<EvermarkMetadata> for ContentMetadata {
    fn from(doc: EvermarkMetadata) -> Self {
        ContentMetadata {
            name: doc.name,
            description: doc.description.unwrap_or_default(),
            source_url: doc.source_url.unwrap_or_default(),
            image: doc.image.unwrap_or_default(),
            author: doc.author,
            attributes: doc.attributes,
        }
    }
}

fn trait_string(attributes: &[MetadataAttribute], trait_type: &str) -> Option<String> {
    attributes
        .iter()
        .find(|a| {
            a.trait_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(trait_type))
        })
        .and_then(|a| a.value.as_str())
        .map(str::to_string)
}

/// Convert a raw metadata document into the canonical shape.
pub fn migrate(value: Value) -> ContentMetadata {
    let version = SchemaVersion::detect(&value);

    let migrated: Result<ContentMetadata, serde_json::Error> = match version {
        SchemaVersion::Legacy => serde_json::from_value::<LegacyMetadata>(value).map(Into::into),
        SchemaVersion::Erc721 => serde_json::from_value::<Erc721Metadata>(value).map(Into::into),
        SchemaVersion::Evermark => {
            serde_json::from_value::<EvermarkMetadata>(value).map(Into::into)
        }
        SchemaVersion::Unknown => {
            debug!("Unrecognized metadata shape, using empty metadata");
            return ContentMetadata::default();
        }
    };

    migrated.unwrap_or_else(|e| {
        debug!(version = ?version, error = %e, "Metadata did not match its schema");
        ContentMetadata::default()
    })
}
