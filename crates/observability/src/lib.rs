use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Verification metrics
    pub static ref VERIFICATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "medverify_verifications_total",
            "Verification and receipt attempts by channel and result"
        ),
        &["channel", "result"]
    ).unwrap();

    pub static ref SUSPECT_FLAGS: IntCounter = IntCounter::new(
        "medverify_suspect_flags_total",
        "Total number of SUSPECT outcomes"
    ).unwrap();

    pub static ref LOCKOUTS: IntCounter = IntCounter::new(
        "medverify_lockouts_total",
        "Batches locked after repeated invalid codes"
    ).unwrap();

    // Record metrics
    pub static ref INCIDENTS_RAISED: IntCounterVec = IntCounterVec::new(
        Opts::new("medverify_incidents_total", "Incidents created by reason code"),
        &["reason"]
    ).unwrap();

    pub static ref BATCHES_REGISTERED: IntCounter = IntCounter::new(
        "medverify_batches_registered_total",
        "Total number of batches registered"
    ).unwrap();
}

static INIT: Once = Once::new();

/// Register all collectors. Safe to call more than once.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(VERIFICATIONS.clone()))
            .unwrap();
        REGISTRY.register(Box::new(SUSPECT_FLAGS.clone())).unwrap();
        REGISTRY.register(Box::new(LOCKOUTS.clone())).unwrap();
        REGISTRY
            .register(Box::new(INCIDENTS_RAISED.clone()))
            .unwrap();
        REGISTRY
            .register(Box::new(BATCHES_REGISTERED.clone()))
            .unwrap();
    });
}

pub fn export_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_verification(channel: &str, result: &str, suspect: bool) {
    VERIFICATIONS.with_label_values(&[channel, result]).inc();
    if suspect {
        SUSPECT_FLAGS.inc();
    }
}

pub fn record_incident(reason: &str) {
    INCIDENTS_RAISED.with_label_values(&[reason]).inc();
}

pub fn record_lockout() {
    LOCKOUTS.inc();
}

pub fn record_batch_registered() {
    BATCHES_REGISTERED.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_export() {
        init_metrics();
        init_metrics();
        record_verification("verify", "SUSPECT", true);
        record_incident("otp-bruteforce");
        let metrics = export_metrics();
        assert!(metrics.contains("medverify_verifications_total"));
        assert!(metrics.contains("medverify_incidents_total"));
        assert!(metrics.contains("otp-bruteforce"));
    }
}
