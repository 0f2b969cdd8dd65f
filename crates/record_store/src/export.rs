use crate::Document;

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_rows(rows: Vec<Vec<String>>) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|c| csv_field(c))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `id,batchId,reason,time,notes` with every field quoted.
pub fn incidents_csv(doc: &Document) -> String {
    let mut rows = vec![["id", "batchId", "reason", "time", "notes"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>()];
    for i in &doc.incidents {
        rows.push(vec![
            i.id.clone(),
            i.batch_id.clone(),
            i.reason.to_string(),
            core_types::format_timestamp(&i.time),
            i.notes.replace('\n', " "),
        ]);
    }
    csv_rows(rows)
}

/// One row per batch anchor: `batchId,batchNo,hash,chain,tx,time`.
pub fn anchors_csv(doc: &Document) -> String {
    let mut rows = vec![["batchId", "batchNo", "hash", "chain", "tx", "time"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>()];
    for b in doc.batches.values() {
        for a in &b.anchors {
            rows.push(vec![
                b.id.clone(),
                b.meta.batch_no.clone(),
                b.hash.clone(),
                a.chain.clone(),
                a.tx.clone(),
                core_types::format_timestamp(&a.time),
            ]);
        }
    }
    csv_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch_models::{Incident, IncidentReason};
    use chrono::{TimeZone, Utc};
    use proof_standards::ProofManager;

    #[test]
    fn incidents_csv_quotes_and_flattens_notes() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let mut doc = crate::demo_document(now, &ProofManager::default()).unwrap();
        let mut inc = Incident::new(
            "BID_demo",
            IncidentReason::Other("counterfeit-report".to_string()),
            "said \"fake\"\nat counter",
            now,
        )
        .unwrap();
        inc.id = "INC_1".to_string();
        doc.incidents.push(inc);

        let csv = incidents_csv(&doc);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], r#""id","batchId","reason","time","notes""#);
        assert_eq!(
            lines[1],
            r#""INC_1","BID_demo","counterfeit-report","2025-01-01T08:00:00.000Z","said ""fake"" at counter""#
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn anchors_csv_lists_every_anchor() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let doc = crate::demo_document(now, &ProofManager::default()).unwrap();
        let csv = anchors_csv(&doc);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with(r#""BID_demo","NM-2025-001",""#));
        assert!(lines[1].contains(r#""simulated-testnet","SIMDEMO1""#));
    }
}
