//! Batch verification engine.
//!
//! [`VerificationService`] owns the record store, the proof manager and a
//! clock. Decision logic lives in [`procedure`] as pure functions from the
//! current document to a [`procedure::Mutation`]; the service persists the
//! next document before handing the outcome back.

use record_store::StoreError;
use thiserror::Error;

pub mod config;
pub mod fallback;
pub mod kpi;
pub mod outcome;
pub mod procedure;
pub mod qr;
pub mod service;

pub use config::{EngineConfig, LockoutPolicy};
pub use fallback::{parse_ussd, Assurance, BatchSummary, FallbackChannel, FallbackOutcome};
pub use kpi::Kpis;
pub use outcome::{OutcomeReason, VerificationOutcome};
pub use qr::VerifyLink;
pub use service::{RegisterBatch, RegisteredBatch, VerificationService};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("batch {batch_id} is locked until {until}")]
    Locked { batch_id: String, until: String },

    #[error("invalid one-time code for batch {0}")]
    InvalidCode(String),

    #[error("proof mismatch for batch {0}")]
    ProofMismatch(String),

    #[error("import failed: {0}")]
    ImportParse(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("proof error: {0}")]
    Proof(#[from] proof_standards::ProofError),

    #[error("QR encoding failed: {0}")]
    Qr(String),
}

impl From<batch_models::ModelError> for EngineError {
    fn from(e: batch_models::ModelError) -> Self {
        EngineError::InvalidInput(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
