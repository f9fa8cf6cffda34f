//! Collaborator contracts
//!
//! The ledger, the fast store and the upload sink are owned by other
//! components. The core talks to them only through these traits, injected at
//! construction time.

mod fast_store;
mod ledger;
mod upload;

pub use fast_store::{FastStore, FastStoreQuery, FastStoreResponse, NullFastStore};
pub use ledger::LedgerReader;
pub use upload::{DisabledUploadSink, UploadFile, UploadSink};
