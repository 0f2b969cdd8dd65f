use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::BatchMeta;
use crate::validation::{optional, require, validate_hash};
use crate::ModelError;

/// Ledger reference without a timestamp, as carried by lab reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRef {
    pub chain: String,
    pub tx: String,
}

#[derive(Debug, Clone, Default)]
pub struct TransferInput {
    pub distributor: String,
    pub from: Option<String>,
    pub to: String,
    pub batch_id: String,
    pub bol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: String,
    pub distributor: String,
    pub from: String,
    pub to: String,
    pub batch_id: String,
    pub bol: String,
    #[serde(with = "core_types::iso_millis")]
    pub time: DateTime<Utc>,
    pub batch_meta: BatchMeta,
}

impl Transfer {
    /// Distributor, destination and batch are mandatory; origin and
    /// shipping document may be blank.
    pub fn new(
        input: &TransferInput,
        batch_meta: BatchMeta,
        time: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            id: core_types::prefixed_id("T"),
            distributor: require("distributor", &input.distributor)?,
            from: optional(input.from.as_deref()).unwrap_or_default(),
            to: require("destination", &input.to)?,
            batch_id: require("batch id", &input.batch_id)?,
            bol: optional(input.bol.as_deref()).unwrap_or_default(),
            time,
            batch_meta,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabReport {
    pub id: String,
    pub lab: String,
    pub summary: String,
    #[serde(with = "core_types::iso_millis")]
    pub time: DateTime<Utc>,
    pub hash: String,
    pub anchor: AnchorRef,
}

impl LabReport {
    pub fn new(
        lab: &str,
        summary: &str,
        time: DateTime<Utc>,
        hash: String,
        anchor: AnchorRef,
    ) -> Result<Self, ModelError> {
        validate_hash("lab report hash", &hash)?;
        Ok(Self {
            id: core_types::prefixed_id("LR"),
            lab: require("lab", lab)?,
            summary: require("summary", summary)?,
            time,
            hash,
            anchor,
        })
    }
}

/// Why an incident was opened. Serialized as its bare reason code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IncidentReason {
    OtpBruteforce,
    ProofMismatch,
    Other(String),
}

impl IncidentReason {
    pub fn as_str(&self) -> &str {
        match self {
            IncidentReason::OtpBruteforce => "otp-bruteforce",
            IncidentReason::ProofMismatch => "proof-mismatch",
            IncidentReason::Other(code) => code,
        }
    }
}

impl From<String> for IncidentReason {
    fn from(code: String) -> Self {
        match code.as_str() {
            "otp-bruteforce" => IncidentReason::OtpBruteforce,
            "proof-mismatch" => IncidentReason::ProofMismatch,
            _ => IncidentReason::Other(code),
        }
    }
}

impl From<IncidentReason> for String {
    fn from(reason: IncidentReason) -> Self {
        reason.as_str().to_string()
    }
}

impl fmt::Display for IncidentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub batch_id: String,
    pub reason: IncidentReason,
    #[serde(default)]
    pub notes: String,
    #[serde(with = "core_types::iso_millis")]
    pub time: DateTime<Utc>,
}

impl Incident {
    pub fn new(
        batch_id: &str,
        reason: IncidentReason,
        notes: &str,
        time: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        require("reason", reason.as_str())?;
        Ok(Self {
            id: core_types::prefixed_id("INC"),
            batch_id: require("batch id", batch_id)?,
            reason,
            notes: notes.to_string(),
            time,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    Verify,
    Receipt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanResult {
    Authentic,
    Suspect,
}

impl ScanResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanResult::Authentic => "AUTHENTIC",
            ScanResult::Suspect => "SUSPECT",
        }
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    #[serde(rename = "type")]
    pub kind: ScanKind,
    pub batch_id: String,
    #[serde(with = "core_types::iso_millis")]
    pub time: DateTime<Utc>,
    pub result: ScanResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}
