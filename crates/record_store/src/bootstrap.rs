use batch_models::{generate_otp, Batch, BatchMeta, BatchMetaInput, KycStatus, Manufacturer};
use chrono::{DateTime, Utc};
use proof_standards::ProofManager;

use crate::{Document, StoreResult};

pub const DEMO_MANUFACTURER_ID: &str = "MAN_demo";
pub const DEMO_BATCH_ID: &str = "BID_demo";

/// Seed document used when storage is empty or after a reset.
pub fn demo_document(now: DateTime<Utc>, proofs: &ProofManager) -> StoreResult<Document> {
    let manufacturer =
        Manufacturer::with_id(DEMO_MANUFACTURER_ID, "NovaMed Pharma", KycStatus::Approved, now)?;
    let meta = BatchMeta::from_input(
        &BatchMetaInput {
            product: "Demo Amoxicillin 500mg".to_string(),
            batch_no: Some("NM-2025-001".to_string()),
            coa: Some("Demo COA".to_string()),
            ..Default::default()
        },
        DEMO_BATCH_ID,
        now.date_naive(),
    )?;

    let mut proof = proofs.stamp_batch(&manufacturer, &meta, now)?;
    proof.anchor.tx = "SIMDEMO1".to_string();

    let batch = Batch::new(
        DEMO_BATCH_ID,
        DEMO_MANUFACTURER_ID,
        meta,
        generate_otp(),
        proof.hash,
        proof.anchor,
    )?;

    let mut doc = Document::default();
    doc.manufacturers
        .insert(manufacturer.id.clone(), manufacturer);
    doc.batches.insert(batch.id.clone(), batch);
    Ok(doc)
}
