//! Whole-document record store.
//!
//! All manufacturers, batches, transfers, incidents and scans live in one
//! [`Document`] which is serialized in full to a [`StorageBackend`] on every
//! commit. The in-memory copy is only replaced after the backend accepted
//! the new document, so readers observe either the previous or the next
//! complete state.

use thiserror::Error;

pub mod bootstrap;
pub mod document;
pub mod export;
pub mod storage;
pub mod store;

pub use bootstrap::{demo_document, DEMO_BATCH_ID, DEMO_MANUFACTURER_ID};
pub use document::Document;
pub use export::{anchors_csv, incidents_csv};
pub use storage::{FileStorage, MemoryStorage, StorageBackend, STATE_FILE_ENV};
pub use store::RecordStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("document failed schema validation: {0}")]
    Schema(String),

    #[error("proof error: {0}")]
    Proof(#[from] proof_standards::ProofError),

    #[error("invalid record: {0}")]
    Model(#[from] batch_models::ModelError),
}

pub type StoreResult<T> = Result<T, StoreError>;
