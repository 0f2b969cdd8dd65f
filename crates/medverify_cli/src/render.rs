//! Human-readable output for the terminal.

use batch_models::{Batch, Incident, LabReport, Manufacturer, Transfer};
use record_store::Document;
use verify_engine::{Kpis, RegisteredBatch, VerificationOutcome};

pub fn registered(r: &RegisteredBatch) -> String {
    format!(
        "registered {}\n  manufacturer: {}\n  otp:          {}\n  hash:         {}\n  anchor tx:    {}",
        r.batch_id, r.manufacturer_id, r.otp, r.hash, r.anchor_tx
    )
}

pub fn outcome(o: &VerificationOutcome) -> String {
    format!("[{}] {}", o.batch_id, o.message)
}

pub fn kpis(k: &Kpis) -> String {
    format!(
        "scans: {}\nsuspect flags: {}\nincidents: {}\nbatches: {} ({} locked)\nmanufacturers: {}",
        k.scans, k.suspect_flags, k.incidents, k.batches, k.locked_batches, k.manufacturers
    )
}

pub fn batches(batches: &[&Batch], doc: &Document) -> String {
    if batches.is_empty() {
        return "no batches".to_string();
    }
    batches
        .iter()
        .map(|b| {
            let maker = doc
                .manufacturers
                .get(&b.manufacturer_id)
                .map(|m| m.name.as_str())
                .unwrap_or("?");
            let lock = match b.lock_until {
                Some(until) => format!(" locked-until={}", short_time(&until)),
                None => String::new(),
            };
            format!(
                "{}  {}  {}  exp {}  by {}  attempts={}{}",
                b.id, b.meta.batch_no, b.meta.product, b.meta.expiry, maker, b.attempts, lock
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn transfers(transfers: &[&Transfer]) -> String {
    if transfers.is_empty() {
        return "no transfers".to_string();
    }
    transfers
        .iter()
        .map(|t| {
            format!(
                "{}  {}  {} -> {}  via {}  {}",
                short_time(&t.time),
                t.batch_id,
                if t.from.is_empty() { "-" } else { t.from.as_str() },
                t.to,
                t.distributor,
                t.bol
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn lab_reports(reports: &[(&Batch, &LabReport)]) -> String {
    if reports.is_empty() {
        return "no lab reports".to_string();
    }
    reports
        .iter()
        .map(|(b, r)| format!("{}  {}  {}  {}  tx={}", b.id, r.lab, r.summary, r.hash, r.anchor.tx))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn incidents(incidents: &[Incident]) -> String {
    if incidents.is_empty() {
        return "no incidents".to_string();
    }
    incidents
        .iter()
        .map(|i| format!("{}  {}  {}  {}", short_time(&i.time), i.batch_id, i.reason, i.notes))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn manufacturers(manufacturers: &[&Manufacturer]) -> String {
    manufacturers
        .iter()
        .map(|m| format!("{}  {}  kyc={}", m.id, m.name, m.kyc.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn short_time(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn empty_listings_say_so() {
        assert_eq!(transfers(&[]), "no transfers");
        assert_eq!(incidents(&[]), "no incidents");
        assert_eq!(lab_reports(&[]), "no lab reports");
    }

    #[test]
    fn incident_line_includes_reason_and_notes() {
        let incident = Incident::new(
            "BID_demo",
            batch_models::IncidentReason::OtpBruteforce,
            "kiosk 4",
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 5, 0).unwrap(),
        )
        .unwrap();
        assert_eq!(
            incidents(&[incident]),
            "2025-06-01 12:05  BID_demo  otp-bruteforce  kiosk 4"
        );
    }
}
