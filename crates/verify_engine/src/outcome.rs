use batch_models::ScanResult;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::fallback::Assurance;
use crate::EngineError;

/// Why a verification or receipt ended the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "kebab-case")]
pub enum OutcomeReason {
    Verified {
        manufacturer: String,
        expiry: NaiveDate,
    },
    ReceiptConfirmed,
    NotFound,
    Locked {
        #[serde(with = "core_types::iso_millis")]
        until: DateTime<Utc>,
    },
    InvalidCode {
        attempts: u32,
        #[serde(
            with = "core_types::iso_millis::option",
            skip_serializing_if = "Option::is_none"
        )]
        locked_until: Option<DateTime<Utc>>,
    },
    ProofMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub batch_id: String,
    pub status: ScanResult,
    pub reason: OutcomeReason,
    pub message: String,
}

impl VerificationOutcome {
    pub(crate) fn new(batch_id: &str, reason: OutcomeReason) -> Self {
        let (status, message) = match &reason {
            OutcomeReason::Verified {
                manufacturer,
                expiry,
            } => (
                ScanResult::Authentic,
                format!("AUTHENTIC - Manufacturer: {manufacturer} | Expiry: {expiry}"),
            ),
            OutcomeReason::ReceiptConfirmed => (
                ScanResult::Authentic,
                "Receipt confirmed - AUTHENTIC".to_string(),
            ),
            OutcomeReason::NotFound => {
                (ScanResult::Suspect, "SUSPECT - batch not found".to_string())
            }
            OutcomeReason::Locked { .. } => (
                ScanResult::Suspect,
                "SUSPECT - batch temporarily locked due to failed OTP attempts".to_string(),
            ),
            OutcomeReason::InvalidCode {
                locked_until: Some(_),
                ..
            } => (
                ScanResult::Suspect,
                "SUSPECT - Invalid OTP (scratch code). Too many failed attempts: batch locked and incident created"
                    .to_string(),
            ),
            OutcomeReason::InvalidCode { .. } => (
                ScanResult::Suspect,
                "SUSPECT - Invalid OTP (scratch code).".to_string(),
            ),
            OutcomeReason::ProofMismatch => (
                ScanResult::Suspect,
                "SUSPECT - proof mismatch (possible tampering)".to_string(),
            ),
        };
        Self {
            batch_id: batch_id.to_string(),
            status,
            reason,
            message,
        }
    }

    pub fn is_authentic(&self) -> bool {
        self.status == ScanResult::Authentic
    }

    /// Code-checked channels always carry full assurance.
    pub fn assurance(&self) -> Assurance {
        Assurance::Full
    }

    /// Map a SUSPECT outcome onto the engine error taxonomy.
    pub fn into_result(self) -> Result<Self, EngineError> {
        let batch_id = self.batch_id.clone();
        match self.reason {
            OutcomeReason::Verified { .. } | OutcomeReason::ReceiptConfirmed => Ok(self),
            OutcomeReason::NotFound => Err(EngineError::NotFound(format!("batch {batch_id}"))),
            OutcomeReason::Locked { until } => Err(EngineError::Locked {
                batch_id,
                until: core_types::format_timestamp(&until),
            }),
            OutcomeReason::InvalidCode { .. } => Err(EngineError::InvalidCode(batch_id)),
            OutcomeReason::ProofMismatch => Err(EngineError::ProofMismatch(batch_id)),
        }
    }
}
