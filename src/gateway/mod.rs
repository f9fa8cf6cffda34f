//! Content-addressed metadata resolution
//!
//! - [`address`]: URI parsing and CID validation
//! - [`schema`]: versioned metadata documents and migration
//! - [`resolver`]: multi-gateway failover

pub mod address;
pub mod resolver;
pub mod schema;

pub use address::ContentAddress;
pub use resolver::GatewayResolver;
pub use schema::{migrate, ContentMetadata, MetadataAttribute, SchemaVersion, CURRENT_SCHEMA_VERSION};
