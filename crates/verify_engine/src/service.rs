use std::sync::Arc;

use batch_models::validation::require;
use batch_models::{
    generate_otp, Batch, BatchMeta, BatchMetaInput, Incident, IncidentReason, KycStatus,
    LabReport, Manufacturer, ScanResult, Transfer, TransferInput,
};
use clock::Clock;
use proof_standards::ProofManager;
use record_store::{Document, RecordStore, StorageBackend, StoreError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::fallback::{self, FallbackOutcome};
use crate::kpi::Kpis;
use crate::outcome::{OutcomeReason, VerificationOutcome};
use crate::procedure::{self, Mutation};
use crate::qr::{self, VerifyLink};
use crate::{EngineError, EngineResult};

/// Manufacturer-side registration form.
#[derive(Debug, Clone)]
pub struct RegisterBatch {
    pub manufacturer_name: String,
    /// Only used when the manufacturer does not exist yet.
    pub kyc: KycStatus,
    pub meta: BatchMetaInput,
}

/// What the manufacturer needs to print the sticker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredBatch {
    pub batch_id: String,
    pub manufacturer_id: String,
    pub otp: String,
    pub hash: String,
    pub anchor_tx: String,
}

pub struct VerificationService {
    store: RecordStore,
    proofs: ProofManager,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl VerificationService {
    pub fn new(
        store: RecordStore,
        proofs: ProofManager,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        observability::init_metrics();
        info!(
            backend = %store.backend_description(),
            chain = proofs.backend_name(),
            batches = store.document().batches.len(),
            "verification service ready"
        );
        Self {
            store,
            proofs,
            clock,
            config,
        }
    }

    /// Open (or bootstrap) the document in `backend` with the simulated anchor backend.
    pub fn open(
        backend: Box<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        let proofs = ProofManager::with_simulated_backend();
        let store = RecordStore::open(backend, clock.now(), &proofs)?;
        Ok(Self::new(store, proofs, clock, config))
    }

    /// Discard whatever `backend` holds, readable or not, and start from
    /// the demo document.
    pub fn open_reset(
        backend: Box<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        let proofs = ProofManager::with_simulated_backend();
        let store = RecordStore::reseed(backend, clock.now(), &proofs)?;
        Ok(Self::new(store, proofs, clock, config))
    }

    pub fn document(&self) -> &Document {
        self.store.document()
    }

    fn apply<T>(&mut self, mutation: Mutation<T>) -> EngineResult<T> {
        if let Some(next) = mutation.next {
            self.store.commit(next)?;
        }
        for incident in &mutation.incidents {
            warn!(
                incident_id = %incident.id,
                batch_id = %incident.batch_id,
                reason = %incident.reason,
                "incident created"
            );
            observability::record_incident(incident.reason.as_str());
        }
        Ok(mutation.outcome)
    }

    fn record_outcome(&self, channel: &str, outcome: &VerificationOutcome) {
        let suspect = outcome.status == ScanResult::Suspect;
        observability::record_verification(channel, outcome.status.as_str(), suspect);
        if let OutcomeReason::InvalidCode {
            attempts,
            locked_until: Some(until),
        } = &outcome.reason
        {
            observability::record_lockout();
            warn!(
                batch_id = %outcome.batch_id,
                attempts,
                until = %core_types::format_timestamp(until),
                "batch locked after repeated invalid codes"
            );
        }
        debug!(
            channel,
            batch_id = %outcome.batch_id,
            status = %outcome.status,
            "verification finished"
        );
    }

    /// Register a batch, creating the manufacturer on first use of its name.
    pub fn register_batch(&mut self, req: RegisterBatch) -> EngineResult<RegisteredBatch> {
        let name = require("manufacturer name", &req.manufacturer_name)?;
        require("product", &req.meta.product)?;

        let now = self.clock.now();
        let mut next = self.document().clone();

        let existing = next.manufacturer_by_name(&name).cloned();
        let manufacturer = match existing {
            Some(m) => m,
            None => {
                let m = Manufacturer::new(&name, req.kyc, now)?;
                next.manufacturers.insert(m.id.clone(), m.clone());
                m
            }
        };

        let batch_id = core_types::prefixed_id("BID");
        let meta = BatchMeta::from_input(&req.meta, &batch_id, now.date_naive())?;
        let proof = self.proofs.stamp_batch(&manufacturer, &meta, now)?;
        let batch = Batch::new(
            batch_id.clone(),
            manufacturer.id.clone(),
            meta,
            generate_otp(),
            proof.hash,
            proof.anchor,
        )?;

        let registered = RegisteredBatch {
            batch_id: batch.id.clone(),
            manufacturer_id: manufacturer.id.clone(),
            otp: batch.otp.clone(),
            hash: batch.hash.clone(),
            anchor_tx: batch.anchors[0].tx.clone(),
        };
        next.batches.insert(batch_id, batch);
        self.store.commit(next)?;

        observability::record_batch_registered();
        info!(
            batch_id = %registered.batch_id,
            manufacturer_id = %registered.manufacturer_id,
            anchor_tx = %registered.anchor_tx,
            "batch registered and anchored"
        );
        Ok(registered)
    }

    pub fn log_transfer(&mut self, input: TransferInput) -> EngineResult<Transfer> {
        require("distributor", &input.distributor)?;
        require("destination", &input.to)?;
        let batch_id = require("batch id", &input.batch_id)?;

        let now = self.clock.now();
        let mut next = self.document().clone();
        let batch = next
            .batches
            .get_mut(&batch_id)
            .ok_or_else(|| EngineError::NotFound(format!("batch {batch_id}")))?;

        let transfer = Transfer::new(
            &TransferInput {
                batch_id: batch_id.clone(),
                ..input
            },
            batch.meta.clone(),
            now,
        )?;
        batch.transfers.push(transfer.clone());
        next.transfers.push(transfer.clone());
        self.store.commit(next)?;

        info!(
            transfer_id = %transfer.id,
            batch_id = %transfer.batch_id,
            to = %transfer.to,
            "transfer logged"
        );
        Ok(transfer)
    }

    /// Pharmacy receipt confirmation. Requires both a batch id and a code.
    pub fn pharmacy_receive(
        &mut self,
        batch_id: &str,
        code: &str,
    ) -> EngineResult<VerificationOutcome> {
        let batch_id = require("batch id", batch_id)?;
        let code = require("otp", code)?;
        let now = self.clock.now();
        let mutation = procedure::receive(
            self.document(),
            &batch_id,
            &code,
            now,
            &self.config.lockout,
        )?;
        let outcome = self.apply(mutation)?;
        self.record_outcome("receipt", &outcome);
        Ok(outcome)
    }

    /// End-user verification via QR/OTP.
    pub fn verify(&mut self, batch_id: &str, code: &str) -> EngineResult<VerificationOutcome> {
        let now = self.clock.now();
        let mutation = procedure::verify(
            self.document(),
            batch_id.trim(),
            code.trim(),
            now,
            &self.config.lockout,
        )?;
        let outcome = self.apply(mutation)?;
        self.record_outcome("verify", &outcome);
        Ok(outcome)
    }

    /// USSD short-code lookup. Existence only, no code check.
    pub fn ussd_query(&self, input: &str) -> EngineResult<FallbackOutcome> {
        let batch_id = fallback::parse_ussd(input)?;
        let outcome = fallback::ussd_outcome(&batch_id, self.document().batches.get(&batch_id));
        debug!(batch_id = %batch_id, status = %outcome.status, "ussd lookup");
        Ok(outcome)
    }

    /// SMS lookup by batch id and sender number. Returns metadata, no code check.
    pub fn sms_query(&self, batch_id: &str, phone: &str) -> EngineResult<FallbackOutcome> {
        let batch_id = require("batch id", batch_id)?;
        let phone = require("phone", phone)?;
        let outcome = fallback::sms_outcome(&batch_id, self.document().batches.get(&batch_id));
        debug!(batch_id = %batch_id, phone = %phone, status = %outcome.status, "sms lookup");
        Ok(outcome)
    }

    pub fn upload_lab_report(
        &mut self,
        batch_id: &str,
        lab: &str,
        summary: &str,
    ) -> EngineResult<LabReport> {
        let lab = require("lab", lab)?;
        let batch_id = require("batch id", batch_id)?;
        let summary = require("summary", summary)?;

        let now = self.clock.now();
        let mut next = self.document().clone();
        let batch = next
            .batches
            .get_mut(&batch_id)
            .ok_or_else(|| EngineError::NotFound(format!("batch {batch_id}")))?;

        let proof = self.proofs.stamp_lab_report(&lab, &summary, now)?;
        let report = LabReport::new(&lab, &summary, now, proof.hash, proof.anchor)?;
        batch.lab_reports.push(report.clone());
        self.store.commit(next)?;

        info!(
            report_id = %report.id,
            batch_id = %batch_id,
            anchor_tx = %report.anchor.tx,
            "lab report anchored"
        );
        Ok(report)
    }

    /// Manually open an incident against an existing batch.
    pub fn create_incident(
        &mut self,
        batch_id: &str,
        reason: &str,
        notes: &str,
    ) -> EngineResult<Incident> {
        let batch_id = require("batch id", batch_id)?;
        let reason = IncidentReason::from(require("reason", reason)?);
        if !self.document().batches.contains_key(&batch_id) {
            return Err(EngineError::NotFound(format!("batch {batch_id}")));
        }

        let incident = Incident::new(&batch_id, reason, notes, self.clock.now())?;
        let mut next = self.document().clone();
        next.incidents.push(incident.clone());
        self.apply(Mutation {
            next: Some(next),
            outcome: (),
            incidents: vec![incident.clone()],
        })?;
        Ok(incident)
    }

    /// Flip a manufacturer between approved and pending. Batches stamped
    /// under the previous status will no longer match their proof.
    pub fn toggle_kyc(&mut self, manufacturer_id: &str) -> EngineResult<KycStatus> {
        let mut next = self.document().clone();
        let manufacturer = next
            .manufacturers
            .get_mut(manufacturer_id)
            .ok_or_else(|| EngineError::NotFound(format!("manufacturer {manufacturer_id}")))?;
        manufacturer.kyc = manufacturer.kyc.toggled();
        let status = manufacturer.kyc;
        self.store.commit(next)?;

        info!(manufacturer_id, kyc = status.as_str(), "manufacturer KYC toggled");
        Ok(status)
    }

    pub fn kpis(&self) -> Kpis {
        Kpis::from_document(self.document(), self.clock.now())
    }

    /// Transfers, newest first.
    pub fn recent_transfers(&self) -> Vec<&Transfer> {
        self.document().transfers.iter().rev().collect()
    }

    /// Every lab report paired with the batch it belongs to.
    pub fn lab_reports(&self) -> Vec<(&Batch, &LabReport)> {
        self.document()
            .batches
            .values()
            .flat_map(|b| b.lab_reports.iter().map(move |r| (b, r)))
            .collect()
    }

    pub fn verify_link(&self, batch_id: &str) -> EngineResult<VerifyLink> {
        self.verify_link_at(&self.config.verify_base_url, batch_id)
    }

    /// Like [`Self::verify_link`] but against an explicit verification page.
    pub fn verify_link_at(&self, base_url: &str, batch_id: &str) -> EngineResult<VerifyLink> {
        if !self.document().batches.contains_key(batch_id) {
            return Err(EngineError::NotFound(format!("batch {batch_id}")));
        }
        qr::render_link(base_url, batch_id)
    }

    pub fn export_document(&self) -> EngineResult<String> {
        Ok(self.store.export_json()?)
    }

    /// Replace the whole store. Parse or schema failures leave it untouched.
    pub fn import_document(&mut self, text: &str) -> EngineResult<()> {
        self.store.import_json(text).map_err(|e| match e {
            StoreError::Parse(err) => EngineError::ImportParse(err.to_string()),
            StoreError::Schema(msg) => EngineError::ImportParse(msg),
            other => EngineError::Storage(other),
        })
    }

    pub fn reset_document(&mut self) -> EngineResult<()> {
        let now = self.clock.now();
        self.store.reset(now, &self.proofs)?;
        Ok(())
    }

    pub fn incidents_csv(&self) -> String {
        record_store::incidents_csv(self.document())
    }

    pub fn anchors_csv(&self) -> String {
        record_store::anchors_csv(self.document())
    }
}
