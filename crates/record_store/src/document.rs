use std::collections::{BTreeMap, BTreeSet};

use batch_models::{Batch, Incident, Manufacturer, ScanEvent, ScanResult, Transfer};
use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

/// The persisted document. Field names are the storage format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub manufacturers: BTreeMap<String, Manufacturer>,
    pub batches: BTreeMap<String, Batch>,
    pub transfers: Vec<Transfer>,
    pub incidents: Vec<Incident>,
    pub scans: Vec<ScanEvent>,
}

impl Document {
    pub fn from_json(text: &str) -> StoreResult<Self> {
        let doc: Document = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn to_json_pretty(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn manufacturer_by_name(&self, name: &str) -> Option<&Manufacturer> {
        self.manufacturers.values().find(|m| m.name == name)
    }

    pub fn suspect_scan_count(&self) -> usize {
        self.scans
            .iter()
            .filter(|s| s.result == ScanResult::Suspect)
            .count()
    }

    /// Cross-record consistency checks applied to imported and loaded documents.
    pub fn validate(&self) -> StoreResult<()> {
        let mut problems = Vec::new();

        for (key, m) in &self.manufacturers {
            if key != &m.id {
                problems.push(format!("manufacturer key {key} does not match id {}", m.id));
            }
            if m.name.trim().is_empty() {
                problems.push(format!("manufacturer {key} has an empty name"));
            }
        }

        let batch_ids: BTreeSet<&str> = self.batches.keys().map(String::as_str).collect();

        for (key, b) in &self.batches {
            if key != &b.id {
                problems.push(format!("batch key {key} does not match id {}", b.id));
            }
            if let Err(e) = b.validate() {
                problems.push(format!("batch {key}: {e}"));
            }
            if !self.manufacturers.contains_key(&b.manufacturer_id) {
                problems.push(format!(
                    "batch {key} references unknown manufacturer {}",
                    b.manufacturer_id
                ));
            }
            if b.anchors.is_empty() {
                problems.push(format!("batch {key} has no anchor"));
            }
            for t in &b.transfers {
                if t.batch_id != b.id {
                    problems.push(format!("transfer {} filed under batch {key}", t.id));
                }
            }
            for r in &b.lab_reports {
                if !core_types::is_hex_digest(&r.hash) {
                    problems.push(format!("lab report {} has a malformed hash", r.id));
                }
            }
        }

        for t in &self.transfers {
            if !batch_ids.contains(t.batch_id.as_str()) {
                problems.push(format!("transfer {} references unknown batch {}", t.id, t.batch_id));
            }
        }
        for i in &self.incidents {
            if !batch_ids.contains(i.batch_id.as_str()) {
                problems.push(format!("incident {} references unknown batch {}", i.id, i.batch_id));
            }
        }
        for s in &self.scans {
            if !batch_ids.contains(s.batch_id.as_str()) {
                problems.push(format!("scan references unknown batch {}", s.batch_id));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Schema(problems.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::demo_document;
    use chrono::{TimeZone, Utc};
    use proof_standards::ProofManager;

    fn demo() -> Document {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        demo_document(now, &ProofManager::with_simulated_backend()).unwrap()
    }

    #[test]
    fn demo_document_is_valid_and_round_trips() {
        let doc = demo();
        doc.validate().unwrap();
        let back = Document::from_json(&doc.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn mismatched_keys_and_dangling_refs_are_reported() {
        let mut doc = demo();
        let batch = doc.batches.remove("BID_demo").unwrap();
        doc.batches.insert("BID_other".to_string(), batch);
        doc.manufacturers.clear();

        let err = doc.validate().unwrap_err().to_string();
        assert!(err.contains("does not match id"), "{err}");
        assert!(err.contains("unknown manufacturer"), "{err}");
    }

    #[test]
    fn missing_collections_fail_to_parse() {
        assert!(matches!(
            Document::from_json(r#"{"manufacturers":{}}"#),
            Err(StoreError::Parse(_))
        ));
        assert!(Document::from_json(
            r#"{"manufacturers":{},"batches":{},"transfers":[],"incidents":[],"scans":[]}"#
        )
        .is_ok());
    }
}
