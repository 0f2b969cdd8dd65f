use chrono::{DateTime, Utc};
use record_store::Document;
use serde::Serialize;

/// Admin dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub scans: usize,
    pub suspect_flags: usize,
    pub incidents: usize,
    pub batches: usize,
    pub manufacturers: usize,
    pub locked_batches: usize,
}

impl Kpis {
    pub fn from_document(doc: &Document, now: DateTime<Utc>) -> Self {
        Self {
            scans: doc.scans.len(),
            suspect_flags: doc.suspect_scan_count(),
            incidents: doc.incidents.len(),
            batches: doc.batches.len(),
            manufacturers: doc.manufacturers.len(),
            locked_batches: doc.batches.values().filter(|b| b.is_locked_at(now)).count(),
        }
    }
}
