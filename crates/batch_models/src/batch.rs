use chrono::{DateTime, Months, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::records::{LabReport, Transfer};
use crate::validation::{optional, require, validate_hash, validate_otp};
use crate::ModelError;

pub const OTP_LEN: usize = 6;

/// Random 6-digit scratch code, never starting with zero.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000u32).to_string()
}

/// Batch metadata. Field order is part of the proof input; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMeta {
    pub product: String,
    #[serde(rename = "batchNo")]
    pub batch_no: String,
    pub mfg: NaiveDate,
    pub expiry: NaiveDate,
    pub coa: String,
}

/// Unvalidated registration form for [`BatchMeta`].
#[derive(Debug, Clone, Default)]
pub struct BatchMetaInput {
    pub product: String,
    pub batch_no: Option<String>,
    pub mfg: Option<NaiveDate>,
    pub expiry: Option<NaiveDate>,
    pub coa: Option<String>,
}

impl BatchMeta {
    /// Build metadata from a form. The batch number falls back to the batch
    /// id, the manufacture date to `today` and the expiry to two years later.
    pub fn from_input(
        input: &BatchMetaInput,
        batch_id: &str,
        today: NaiveDate,
    ) -> Result<Self, ModelError> {
        let product = require("product", &input.product)?;
        let batch_no = optional(input.batch_no.as_deref()).unwrap_or_else(|| batch_id.to_string());
        let mfg = input.mfg.unwrap_or(today);
        let expiry = match input.expiry {
            Some(d) => d,
            None => today
                .checked_add_months(Months::new(24))
                .ok_or(ModelError::InvalidField {
                    field: "expiry",
                    reason: "date out of range".to_string(),
                })?,
        };
        Ok(Self {
            product,
            batch_no,
            mfg,
            expiry,
            coa: optional(input.coa.as_deref()).unwrap_or_default(),
        })
    }
}

/// Simulated ledger reference attached to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub chain: String,
    pub tx: String,
    #[serde(with = "core_types::iso_millis")]
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub manufacturer_id: String,
    pub meta: BatchMeta,
    pub otp: String,
    pub hash: String,
    pub anchors: Vec<Anchor>,
    pub transfers: Vec<Transfer>,
    pub lab_reports: Vec<LabReport>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(
        default,
        with = "core_types::iso_millis::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub lock_until: Option<DateTime<Utc>>,
}

impl Batch {
    pub fn new(
        id: impl Into<String>,
        manufacturer_id: impl Into<String>,
        meta: BatchMeta,
        otp: impl Into<String>,
        hash: impl Into<String>,
        anchor: Anchor,
    ) -> Result<Self, ModelError> {
        let batch = Self {
            id: id.into(),
            manufacturer_id: manufacturer_id.into(),
            meta,
            otp: otp.into(),
            hash: hash.into(),
            anchors: vec![anchor],
            transfers: Vec::new(),
            lab_reports: Vec::new(),
            attempts: 0,
            lock_until: None,
        };
        batch.validate()?;
        Ok(batch)
    }

    /// Structural checks shared by construction and document import.
    pub fn validate(&self) -> Result<(), ModelError> {
        require("batch id", &self.id)?;
        require("manufacturerId", &self.manufacturer_id)?;
        require("product", &self.meta.product)?;
        require("batchNo", &self.meta.batch_no)?;
        validate_otp(&self.otp)?;
        validate_hash("hash", &self.hash)?;
        Ok(())
    }

    /// A lock only holds while `now` is strictly before its expiry.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.lock_until, Some(until) if now < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn sample_meta() -> BatchMeta {
        BatchMeta::from_input(
            &BatchMetaInput {
                product: "Amoxicillin 500mg".to_string(),
                batch_no: Some("B1".to_string()),
                ..Default::default()
            },
            "BID_abc1234",
            today(),
        )
        .unwrap()
    }

    fn sample_anchor() -> Anchor {
        Anchor {
            chain: crate::SIMULATED_CHAIN.to_string(),
            tx: "SIM-abc1234".to_string(),
            time: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn generated_otp_is_six_digits() {
        for _ in 0..32 {
            let otp = generate_otp();
            assert!(validate_otp(&otp).is_ok(), "bad otp {otp}");
            assert!(!otp.starts_with('0'));
        }
    }

    #[test]
    fn meta_defaults_follow_registration_rules() {
        let meta = BatchMeta::from_input(
            &BatchMetaInput {
                product: "Paracetamol".to_string(),
                ..Default::default()
            },
            "BID_xyz0000",
            today(),
        )
        .unwrap();
        assert_eq!(meta.batch_no, "BID_xyz0000");
        assert_eq!(meta.mfg, today());
        assert_eq!(meta.expiry, NaiveDate::from_ymd_opt(2027, 6, 1).unwrap());
        assert_eq!(meta.coa, "");
    }

    #[test]
    fn meta_requires_product() {
        let err = BatchMeta::from_input(&BatchMetaInput::default(), "BID_x", today()).unwrap_err();
        assert_eq!(err, ModelError::MissingField("product"));
    }

    #[test]
    fn batch_rejects_malformed_otp_and_hash() {
        let hash = "a".repeat(64);
        assert!(Batch::new("BID_1", "MAN_1", sample_meta(), "12345", &hash, sample_anchor()).is_err());
        assert!(Batch::new("BID_1", "MAN_1", sample_meta(), "123456", "zz", sample_anchor()).is_err());
        let batch =
            Batch::new("BID_1", "MAN_1", sample_meta(), "123456", &hash, sample_anchor()).unwrap();
        assert_eq!(batch.attempts, 0);
        assert_eq!(batch.anchors.len(), 1);
    }

    #[test]
    fn lock_expires_at_boundary() {
        let hash = "b".repeat(64);
        let mut batch =
            Batch::new("BID_1", "MAN_1", sample_meta(), "123456", &hash, sample_anchor()).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        assert!(!batch.is_locked_at(now));

        batch.lock_until = Some(now + Duration::minutes(15));
        assert!(batch.is_locked_at(now + Duration::minutes(14)));
        assert!(!batch.is_locked_at(now + Duration::minutes(15)));
    }

    #[test]
    fn legacy_batch_without_attempts_deserializes() {
        let json = format!(
            r#"{{"id":"BID_demo","manufacturerId":"MAN_demo","meta":{{"product":"Demo","batchNo":"NM-2025-001","mfg":"2025-01-01","expiry":"2027-01-01","coa":"Demo COA"}},"otp":"482913","hash":"{}","anchors":[{{"chain":"simulated-testnet","tx":"SIMDEMO1","time":"2025-01-01T08:30:00.000Z"}}],"transfers":[],"labReports":[]}}"#,
            "c".repeat(64)
        );
        let batch: Batch = serde_json::from_str(&json).unwrap();
        assert_eq!(batch.attempts, 0);
        assert!(batch.lock_until.is_none());
        assert_eq!(batch.meta.batch_no, "NM-2025-001");
    }
}
