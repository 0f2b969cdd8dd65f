//! Record types for the batch verification workflow.
//!
//! Every entity is a plain serde record whose field names match the
//! persisted document (`manufacturerId`, `batchNo`, `labReports`, ...).
//! Constructors reject missing required fields with [`ModelError`] so a
//! partially initialised record never reaches the store.

use thiserror::Error;

pub mod batch;
pub mod manufacturer;
pub mod records;
pub mod validation;

pub use batch::{generate_otp, Anchor, Batch, BatchMeta, BatchMetaInput, OTP_LEN};
pub use manufacturer::{KycStatus, Manufacturer};
pub use records::{
    AnchorRef, Incident, IncidentReason, LabReport, ScanEvent, ScanKind, ScanResult, Transfer,
    TransferInput,
};

/// Label stamped on every simulated ledger anchor.
pub const SIMULATED_CHAIN: &str = "simulated-testnet";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
