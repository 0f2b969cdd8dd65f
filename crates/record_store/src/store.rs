use chrono::{DateTime, Utc};
use proof_standards::ProofManager;
use tracing::{debug, info, warn};

use crate::{demo_document, Document, StorageBackend, StoreResult};

/// Owns the current document and the backend it is persisted to.
pub struct RecordStore {
    document: Document,
    backend: Box<dyn StorageBackend>,
}

impl RecordStore {
    /// Load the persisted document, seeding demo data when storage is empty.
    pub fn open(
        backend: Box<dyn StorageBackend>,
        now: DateTime<Utc>,
        proofs: &ProofManager,
    ) -> StoreResult<Self> {
        let existing = backend.load()?;
        match existing {
            Some(blob) => {
                let document = Document::from_json(&blob)?;
                debug!(
                    backend = %backend.describe(),
                    batches = document.batches.len(),
                    "loaded document"
                );
                Ok(Self { document, backend })
            }
            None => Self::reseed(backend, now, proofs),
        }
    }

    /// Seed the demo document over whatever `backend` holds, without
    /// reading it. Used to recover from an unreadable state file.
    pub fn reseed(
        backend: Box<dyn StorageBackend>,
        now: DateTime<Utc>,
        proofs: &ProofManager,
    ) -> StoreResult<Self> {
        let mut store = Self {
            document: Document::default(),
            backend,
        };
        store.commit(demo_document(now, proofs)?)?;
        info!(backend = %store.backend.describe(), "seeded demo document");
        Ok(store)
    }

    /// Wrap an explicit document without touching storage until the next commit.
    pub fn with_document(backend: Box<dyn StorageBackend>, document: Document) -> Self {
        Self { document, backend }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Persist `next` in full, then make it current. On a storage error the
    /// previous document stays current.
    pub fn commit(&mut self, next: Document) -> StoreResult<()> {
        let blob = serde_json::to_string(&next)?;
        self.backend.save(&blob)?;
        self.document = next;
        Ok(())
    }

    pub fn export_json(&self) -> StoreResult<String> {
        self.document.to_json_pretty()
    }

    /// Replace the store with a parsed and schema-checked document.
    /// Any failure leaves the current document untouched.
    pub fn import_json(&mut self, text: &str) -> StoreResult<()> {
        let next = match Document::from_json(text) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "rejected document import");
                return Err(e);
            }
        };
        self.commit(next)?;
        info!(
            batches = self.document.batches.len(),
            incidents = self.document.incidents.len(),
            "imported document"
        );
        Ok(())
    }

    /// Replace everything with the demo document. The save replaces the
    /// previous blob in one step, so a failure keeps both copies intact.
    pub fn reset(&mut self, now: DateTime<Utc>, proofs: &ProofManager) -> StoreResult<()> {
        let seeded = demo_document(now, proofs)?;
        self.commit(seeded)?;
        info!(backend = %self.backend.describe(), "reset document to demo data");
        Ok(())
    }

    pub fn backend_description(&self) -> String {
        self.backend.describe()
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("backend", &self.backend.describe())
            .field("batches", &self.document.batches.len())
            .finish()
    }
}

