//! Verification and receipt decision procedures.
//!
//! Each function reads the current [`Document`] and returns a [`Mutation`]:
//! the next document to persist (if anything changed) and the outcome to
//! report. Nothing here touches storage.

use batch_models::{Batch, Incident, IncidentReason, ScanEvent, ScanKind, ScanResult};
use chrono::{DateTime, Utc};
use record_store::Document;

use crate::config::LockoutPolicy;
use crate::outcome::{OutcomeReason, VerificationOutcome};
use crate::{EngineError, EngineResult};

/// Actor label recorded on receipt scans.
pub const PHARMACY_ACTOR: &str = "pharmacy";

#[derive(Debug, Clone)]
pub struct Mutation<T> {
    /// `None` when the operation left the document unchanged.
    pub next: Option<Document>,
    pub outcome: T,
    /// Incidents opened by this operation, in creation order.
    pub incidents: Vec<Incident>,
}

impl<T> Mutation<T> {
    fn unchanged(outcome: T) -> Self {
        Self {
            next: None,
            outcome,
            incidents: Vec::new(),
        }
    }
}

enum Gate<'a> {
    Missing,
    Locked(DateTime<Utc>),
    Open(&'a Batch),
}

fn gate<'a>(doc: &'a Document, batch_id: &str, now: DateTime<Utc>) -> Gate<'a> {
    match doc.batches.get(batch_id) {
        None => Gate::Missing,
        Some(b) => match b.lock_until {
            Some(until) if b.is_locked_at(now) => Gate::Locked(until),
            _ => Gate::Open(b),
        },
    }
}

fn scan(kind: ScanKind, batch_id: &str, now: DateTime<Utc>, result: ScanResult) -> ScanEvent {
    ScanEvent {
        kind,
        batch_id: batch_id.to_string(),
        time: now,
        result,
        actor: match kind {
            ScanKind::Receipt => Some(PHARMACY_ACTOR.to_string()),
            ScanKind::Verify => None,
        },
    }
}

/// Count a wrong code. Locks the batch and opens one `otp-bruteforce`
/// incident when the counter reaches the policy threshold. Only the
/// verify channel records a SUSPECT scan.
fn wrong_code(
    doc: &Document,
    batch: &Batch,
    kind: ScanKind,
    now: DateTime<Utc>,
    policy: &LockoutPolicy,
) -> EngineResult<Mutation<VerificationOutcome>> {
    let mut next = doc.clone();
    let mut incidents = Vec::new();

    let updated = next
        .batches
        .get_mut(&batch.id)
        .ok_or_else(|| EngineError::NotFound(format!("batch {}", batch.id)))?;
    updated.attempts = updated.attempts.saturating_add(1);
    let attempts = updated.attempts;

    let mut locked_until = None;
    if attempts >= policy.max_attempts {
        let until = now + policy.lock_duration;
        updated.lock_until = Some(until);
        locked_until = Some(until);
        incidents.push(Incident::new(
            &batch.id,
            IncidentReason::OtpBruteforce,
            "",
            now,
        )?);
    }

    next.incidents.extend(incidents.iter().cloned());
    // Mistyped receipt codes only count toward the lockout.
    if kind == ScanKind::Verify {
        next.scans.push(scan(kind, &batch.id, now, ScanResult::Suspect));
    }

    Ok(Mutation {
        next: Some(next),
        outcome: VerificationOutcome::new(
            &batch.id,
            OutcomeReason::InvalidCode {
                attempts,
                locked_until,
            },
        ),
        incidents,
    })
}

/// End-user verification: code check, then proof recomputation.
pub fn verify(
    doc: &Document,
    batch_id: &str,
    code: &str,
    now: DateTime<Utc>,
    policy: &LockoutPolicy,
) -> EngineResult<Mutation<VerificationOutcome>> {
    let batch = match gate(doc, batch_id, now) {
        Gate::Missing => {
            return Ok(Mutation::unchanged(VerificationOutcome::new(
                batch_id,
                OutcomeReason::NotFound,
            )))
        }
        Gate::Locked(until) => {
            return Ok(Mutation::unchanged(VerificationOutcome::new(
                batch_id,
                OutcomeReason::Locked { until },
            )))
        }
        Gate::Open(b) => b,
    };

    if !core_types::digests_match(code, &batch.otp) {
        return wrong_code(doc, batch, ScanKind::Verify, now, policy);
    }

    let manufacturer = doc.manufacturers.get(&batch.manufacturer_id);
    let intact = match manufacturer {
        Some(m) => proof_standards::verify_proof(m, &batch.meta, &batch.hash)?,
        None => false,
    };

    let mut next = doc.clone();
    let mut incidents = Vec::new();
    let reason = match (intact, manufacturer) {
        (true, Some(m)) => {
            next.scans
                .push(scan(ScanKind::Verify, batch_id, now, ScanResult::Authentic));
            OutcomeReason::Verified {
                manufacturer: m.name.clone(),
                expiry: batch.meta.expiry,
            }
        }
        _ => {
            next.scans
                .push(scan(ScanKind::Verify, batch_id, now, ScanResult::Suspect));
            incidents.push(Incident::new(
                batch_id,
                IncidentReason::ProofMismatch,
                "",
                now,
            )?);
            next.incidents.extend(incidents.iter().cloned());
            OutcomeReason::ProofMismatch
        }
    };

    Ok(Mutation {
        next: Some(next),
        outcome: VerificationOutcome::new(batch_id, reason),
        incidents,
    })
}

/// Pharmacy receipt: same lock and attempt rules as [`verify`], no proof check.
pub fn receive(
    doc: &Document,
    batch_id: &str,
    code: &str,
    now: DateTime<Utc>,
    policy: &LockoutPolicy,
) -> EngineResult<Mutation<VerificationOutcome>> {
    let batch = match gate(doc, batch_id, now) {
        Gate::Missing => {
            return Ok(Mutation::unchanged(VerificationOutcome::new(
                batch_id,
                OutcomeReason::NotFound,
            )))
        }
        Gate::Locked(until) => {
            return Ok(Mutation::unchanged(VerificationOutcome::new(
                batch_id,
                OutcomeReason::Locked { until },
            )))
        }
        Gate::Open(b) => b,
    };

    if !core_types::digests_match(code, &batch.otp) {
        return wrong_code(doc, batch, ScanKind::Receipt, now, policy);
    }

    let mut next = doc.clone();
    next.scans
        .push(scan(ScanKind::Receipt, batch_id, now, ScanResult::Authentic));

    Ok(Mutation {
        next: Some(next),
        outcome: VerificationOutcome::new(batch_id, OutcomeReason::ReceiptConfirmed),
        incidents: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proof_standards::ProofManager;
    use record_store::{demo_document, DEMO_BATCH_ID};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap()
    }

    fn demo() -> (Document, String) {
        let doc = demo_document(now(), &ProofManager::default()).unwrap();
        let otp = doc.batches[DEMO_BATCH_ID].otp.clone();
        (doc, otp)
    }

    fn wrong(otp: &str) -> String {
        if otp == "000000" { "111111" } else { "000000" }.to_string()
    }

    #[test]
    fn unknown_batch_is_suspect_without_changes() {
        let (doc, _) = demo();
        let m = verify(&doc, "BID_missing", "123456", now(), &LockoutPolicy::default()).unwrap();
        assert!(m.next.is_none());
        assert_eq!(m.outcome.reason, OutcomeReason::NotFound);
        assert_eq!(m.outcome.status, ScanResult::Suspect);
    }

    #[test]
    fn correct_code_on_intact_batch_is_authentic() {
        let (doc, otp) = demo();
        let m = verify(&doc, DEMO_BATCH_ID, &otp, now(), &LockoutPolicy::default()).unwrap();
        assert!(m.outcome.is_authentic());
        assert!(m.incidents.is_empty());
        let next = m.next.unwrap();
        assert_eq!(next.scans.len(), 1);
        assert_eq!(next.scans[0].kind, ScanKind::Verify);
        assert_eq!(next.scans[0].result, ScanResult::Authentic);
        assert_eq!(next.batches[DEMO_BATCH_ID].hash, doc.batches[DEMO_BATCH_ID].hash);
    }

    #[test]
    fn tampered_metadata_opens_one_proof_mismatch_incident() {
        let (mut doc, otp) = demo();
        doc.batches
            .get_mut(DEMO_BATCH_ID)
            .unwrap()
            .meta
            .expiry += Duration::days(365);

        let m = verify(&doc, DEMO_BATCH_ID, &otp, now(), &LockoutPolicy::default()).unwrap();
        assert_eq!(m.outcome.reason, OutcomeReason::ProofMismatch);
        let next = m.next.unwrap();
        assert_eq!(next.incidents.len(), 1);
        assert_eq!(next.incidents[0].reason, IncidentReason::ProofMismatch);
        assert_eq!(next.scans[0].result, ScanResult::Suspect);
    }

    #[test]
    fn missing_manufacturer_counts_as_mismatch() {
        let (mut doc, otp) = demo();
        doc.manufacturers.clear();
        let m = verify(&doc, DEMO_BATCH_ID, &otp, now(), &LockoutPolicy::default()).unwrap();
        assert_eq!(m.outcome.reason, OutcomeReason::ProofMismatch);
        assert_eq!(m.incidents.len(), 1);
    }

    #[test]
    fn fifth_wrong_code_locks_and_opens_single_incident() {
        let (mut doc, otp) = demo();
        let policy = LockoutPolicy::default();
        let bad = wrong(&otp);

        for attempt in 1..=4 {
            let m = verify(&doc, DEMO_BATCH_ID, &bad, now(), &policy).unwrap();
            assert!(m.incidents.is_empty(), "attempt {attempt} opened an incident");
            doc = m.next.unwrap();
            assert_eq!(doc.batches[DEMO_BATCH_ID].attempts, attempt);
            assert!(doc.batches[DEMO_BATCH_ID].lock_until.is_none());
        }

        let m = verify(&doc, DEMO_BATCH_ID, &bad, now(), &policy).unwrap();
        assert_eq!(m.incidents.len(), 1);
        let doc = m.next.unwrap();
        let batch = &doc.batches[DEMO_BATCH_ID];
        assert_eq!(batch.attempts, 5);
        assert_eq!(batch.lock_until, Some(now() + Duration::minutes(15)));
        assert_eq!(doc.incidents.len(), 1);
        assert_eq!(doc.incidents[0].reason, IncidentReason::OtpBruteforce);
        assert_eq!(doc.scans.len(), 5);
        assert!(doc.scans.iter().all(|s| s.result == ScanResult::Suspect));
    }

    #[test]
    fn locked_batch_rejects_without_touching_state() {
        let (mut doc, otp) = demo();
        let until = now() + Duration::minutes(10);
        {
            let b = doc.batches.get_mut(DEMO_BATCH_ID).unwrap();
            b.attempts = 5;
            b.lock_until = Some(until);
        }
        let policy = LockoutPolicy::default();

        let v = verify(&doc, DEMO_BATCH_ID, &otp, now(), &policy).unwrap();
        assert!(v.next.is_none());
        assert_eq!(v.outcome.reason, OutcomeReason::Locked { until });

        let r = receive(&doc, DEMO_BATCH_ID, "000000", now(), &policy).unwrap();
        assert!(r.next.is_none());
        assert!(r.incidents.is_empty());
    }

    #[test]
    fn receipt_records_pharmacy_scan() {
        let (doc, otp) = demo();
        let m = receive(&doc, DEMO_BATCH_ID, &otp, now(), &LockoutPolicy::default()).unwrap();
        assert_eq!(m.outcome.reason, OutcomeReason::ReceiptConfirmed);
        let next = m.next.unwrap();
        assert_eq!(next.scans[0].kind, ScanKind::Receipt);
        assert_eq!(next.scans[0].actor.as_deref(), Some(PHARMACY_ACTOR));
    }

    #[test]
    fn receipt_skips_proof_check() {
        let (mut doc, otp) = demo();
        doc.batches.get_mut(DEMO_BATCH_ID).unwrap().hash = "0".repeat(64);
        let m = receive(&doc, DEMO_BATCH_ID, &otp, now(), &LockoutPolicy::default()).unwrap();
        assert!(m.outcome.is_authentic());
    }

    #[test]
    fn wrong_receipt_code_counts_toward_lockout() {
        let (doc, otp) = demo();
        let policy = LockoutPolicy {
            max_attempts: 1,
            ..LockoutPolicy::default()
        };
        let m = receive(&doc, DEMO_BATCH_ID, &wrong(&otp), now(), &policy).unwrap();
        assert_eq!(m.incidents.len(), 1);
        let next = m.next.unwrap();
        assert!(next.batches[DEMO_BATCH_ID].is_locked_at(now()));
        assert_eq!(next.batches[DEMO_BATCH_ID].attempts, 1);
        assert!(next.scans.is_empty());
        assert_eq!(next.suspect_scan_count(), 0);
    }
}
