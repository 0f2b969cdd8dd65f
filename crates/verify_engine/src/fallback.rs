//! Reduced-assurance lookups for feature phones (USSD short code, SMS).
//! Neither path checks the one-time code, so results are tagged
//! [`Assurance::Reduced`] and no scan events are recorded.

use std::sync::OnceLock;

use batch_models::{Batch, ScanResult};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Assurance {
    Full,
    Reduced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackChannel {
    Ussd,
    Sms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub batch_no: String,
    pub product: String,
    pub expiry: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackOutcome {
    pub channel: FallbackChannel,
    pub assurance: Assurance,
    pub batch_id: String,
    pub status: ScanResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<BatchSummary>,
    pub message: String,
}

/// Extract the batch id from a short code such as `*345*BID_k3x9a0q#`.
pub fn parse_ussd(input: &str) -> EngineResult<String> {
    static USSD_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USSD_REGEX.get_or_init(|| {
        Regex::new(r"(?i)\*\d+\*(BID_[a-z0-9]+)#").expect("static USSD pattern compiles")
    });

    regex
        .captures(input.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            EngineError::InvalidInput("bad format - use *345*BID_xxx#".to_string())
        })
}

pub(crate) fn ussd_outcome(batch_id: &str, batch: Option<&Batch>) -> FallbackOutcome {
    let (status, message) = match batch {
        Some(_) => (
            ScanResult::Authentic,
            "AUTHENTIC - Batch found (limited info via USSD)".to_string(),
        ),
        None => (
            ScanResult::Suspect,
            "SUSPECT - Batch not found (USSD)".to_string(),
        ),
    };
    FallbackOutcome {
        channel: FallbackChannel::Ussd,
        assurance: Assurance::Reduced,
        batch_id: batch_id.to_string(),
        status,
        summary: None,
        message,
    }
}

pub(crate) fn sms_outcome(batch_id: &str, batch: Option<&Batch>) -> FallbackOutcome {
    let summary = batch.map(|b| BatchSummary {
        batch_no: b.meta.batch_no.clone(),
        product: b.meta.product.clone(),
        expiry: b.meta.expiry,
    });
    let (status, message) = match &summary {
        Some(s) => (
            ScanResult::Authentic,
            format!(
                "AUTHENTIC - SMS: Batch {} | {} | exp {}",
                s.batch_no, s.product, s.expiry
            ),
        ),
        None => (
            ScanResult::Suspect,
            "SUSPECT - Batch not found (SMS)".to_string(),
        ),
    };
    FallbackOutcome {
        channel: FallbackChannel::Sms,
        assurance: Assurance::Reduced,
        batch_id: batch_id.to_string(),
        status,
        summary,
        message,
    }
}
