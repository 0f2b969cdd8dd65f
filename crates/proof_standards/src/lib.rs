//! Tamper-evidence proofs for batches and lab reports.
//!
//! A batch proof is the SHA-256 of the canonical JSON of the manufacturer
//! record and the batch metadata taken together. It carries no key and no
//! signature: it fingerprints content at registration so that a later
//! recomputation exposes any edit to either record.
//!
//! # Architecture
//!
//! - [`compute_proof`] / [`verify_proof`]: the proof function itself
//! - [`AnchorBackend`]: where a proof gets "anchored" (ledger reference)
//! - [`SimulatedAnchorBackend`]: default backend producing fake testnet txs
//! - [`ProofManager`]: stamps batches and lab reports through a backend

use batch_models::{Anchor, AnchorRef, BatchMeta, Manufacturer, SIMULATED_CHAIN};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProofError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Anchoring failed: {0}")]
    AnchorFailed(String),
}

/// Canonical proof input. Key order is fixed by field order.
#[derive(Serialize)]
struct BatchProofInput<'a> {
    manufacturer: &'a Manufacturer,
    meta: &'a BatchMeta,
}

#[derive(Serialize)]
struct LabReportProofInput<'a> {
    lab: &'a str,
    summary: &'a str,
    #[serde(with = "core_types::iso_millis")]
    time: DateTime<Utc>,
}

pub fn canonical_batch_json(
    manufacturer: &Manufacturer,
    meta: &BatchMeta,
) -> Result<String, ProofError> {
    Ok(serde_json::to_string(&BatchProofInput { manufacturer, meta })?)
}

/// Hex SHA-256 over (manufacturer, metadata).
pub fn compute_proof(manufacturer: &Manufacturer, meta: &BatchMeta) -> Result<String, ProofError> {
    let canonical = canonical_batch_json(manufacturer, meta)?;
    Ok(core_types::hash_bytes(canonical.as_bytes()).to_hex())
}

/// Recompute the proof and compare it with `expected` in constant time.
pub fn verify_proof(
    manufacturer: &Manufacturer,
    meta: &BatchMeta,
    expected: &str,
) -> Result<bool, ProofError> {
    let actual = compute_proof(manufacturer, meta)?;
    Ok(core_types::digests_match(&actual, expected))
}

pub fn compute_lab_report_hash(
    lab: &str,
    summary: &str,
    time: DateTime<Utc>,
) -> Result<String, ProofError> {
    let canonical = serde_json::to_string(&LabReportProofInput { lab, summary, time })?;
    Ok(core_types::hash_bytes(canonical.as_bytes()).to_hex())
}

/// Destination for proof anchors.
pub trait AnchorBackend: Send + Sync {
    /// Anchor a batch proof, returning the ledger reference.
    fn anchor_batch(&self, proof_hex: &str, at: DateTime<Utc>) -> Result<Anchor, ProofError>;

    /// Anchor a lab report hash.
    fn anchor_lab_report(&self, hash_hex: &str) -> Result<AnchorRef, ProofError>;

    fn chain_label(&self) -> &str;
}

/// Records fake transactions on `simulated-testnet`; nothing leaves the process.
pub struct SimulatedAnchorBackend;

impl AnchorBackend for SimulatedAnchorBackend {
    fn anchor_batch(&self, _proof_hex: &str, at: DateTime<Utc>) -> Result<Anchor, ProofError> {
        Ok(Anchor {
            chain: SIMULATED_CHAIN.to_string(),
            tx: core_types::random_id_with_len("SIM-", 7),
            time: at,
        })
    }

    fn anchor_lab_report(&self, _hash_hex: &str) -> Result<AnchorRef, ProofError> {
        Ok(AnchorRef {
            chain: SIMULATED_CHAIN.to_string(),
            tx: core_types::random_id_with_len("LAB-", 6),
        })
    }

    fn chain_label(&self) -> &str {
        SIMULATED_CHAIN
    }
}

/// Hash plus the anchor produced for it.
#[derive(Debug, Clone)]
pub struct BatchProof {
    pub hash: String,
    pub anchor: Anchor,
}

#[derive(Debug, Clone)]
pub struct LabReportProof {
    pub hash: String,
    pub anchor: AnchorRef,
}

pub struct ProofManager {
    backend: Box<dyn AnchorBackend>,
}

impl ProofManager {
    pub fn new(backend: Box<dyn AnchorBackend>) -> Self {
        Self { backend }
    }

    pub fn with_simulated_backend() -> Self {
        Self::new(Box::new(SimulatedAnchorBackend))
    }

    pub fn stamp_batch(
        &self,
        manufacturer: &Manufacturer,
        meta: &BatchMeta,
        at: DateTime<Utc>,
    ) -> Result<BatchProof, ProofError> {
        let hash = compute_proof(manufacturer, meta)?;
        let anchor = self.backend.anchor_batch(&hash, at)?;
        Ok(BatchProof { hash, anchor })
    }

    pub fn stamp_lab_report(
        &self,
        lab: &str,
        summary: &str,
        at: DateTime<Utc>,
    ) -> Result<LabReportProof, ProofError> {
        let hash = compute_lab_report_hash(lab, summary, at)?;
        let anchor = self.backend.anchor_lab_report(&hash)?;
        Ok(LabReportProof { hash, anchor })
    }

    pub fn backend_name(&self) -> &str {
        self.backend.chain_label()
    }
}

impl Default for ProofManager {
    fn default() -> Self {
        Self::with_simulated_backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch_models::KycStatus;
    use chrono::{NaiveDate, TimeZone};

    fn manufacturer() -> Manufacturer {
        Manufacturer::with_id(
            "MAN_demo",
            "NovaMed Pharma",
            KycStatus::Approved,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn meta() -> BatchMeta {
        BatchMeta {
            product: "Amoxicillin 500mg".to_string(),
            batch_no: "B1".to_string(),
            mfg: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            expiry: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            coa: "assay 99.8%".to_string(),
        }
    }

    #[test]
    fn canonical_json_has_fixed_key_order() {
        let json = canonical_batch_json(&manufacturer(), &meta()).unwrap();
        assert_eq!(
            json,
            r#"{"manufacturer":{"id":"MAN_demo","name":"NovaMed Pharma","kyc":"approved","created":"2025-01-01T00:00:00.000Z"},"meta":{"product":"Amoxicillin 500mg","batchNo":"B1","mfg":"2025-01-01","expiry":"2027-01-01","coa":"assay 99.8%"}}"#
        );
    }

    #[test]
    fn proof_verifies_until_manufacturer_changes() {
        let mut m = manufacturer();
        let hash = compute_proof(&m, &meta()).unwrap();
        assert!(verify_proof(&m, &meta(), &hash).unwrap());

        m.kyc = m.kyc.toggled();
        assert!(!verify_proof(&m, &meta(), &hash).unwrap());
    }

    #[test]
    fn simulated_backend_produces_testnet_anchors() {
        let manager = ProofManager::with_simulated_backend();
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

        let proof = manager.stamp_batch(&manufacturer(), &meta(), at).unwrap();
        assert_eq!(proof.anchor.chain, "simulated-testnet");
        assert!(proof.anchor.tx.starts_with("SIM-"));
        assert_eq!(proof.anchor.time, at);
        assert_eq!(proof.hash, compute_proof(&manufacturer(), &meta()).unwrap());

        let lab = manager.stamp_lab_report("QC Lab", "assay ok", at).unwrap();
        assert!(lab.anchor.tx.starts_with("LAB-"));
        assert_eq!(lab.anchor.tx.len(), "LAB-".len() + 6);
        assert_eq!(manager.backend_name(), "simulated-testnet");
    }

    #[test]
    fn lab_report_hash_depends_on_time() {
        let t1 = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let t2 = t1 + chrono::Duration::milliseconds(1);
        assert_ne!(
            compute_lab_report_hash("QC Lab", "ok", t1).unwrap(),
            compute_lab_report_hash("QC Lab", "ok", t2).unwrap()
        );
    }
}
