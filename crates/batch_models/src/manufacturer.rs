use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::require;
use crate::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Approved,
    Pending,
}

impl KycStatus {
    pub fn toggled(self) -> Self {
        match self {
            KycStatus::Approved => KycStatus::Pending,
            KycStatus::Pending => KycStatus::Approved,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Approved => "approved",
            KycStatus::Pending => "pending",
        }
    }
}

impl std::str::FromStr for KycStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approved" => Ok(KycStatus::Approved),
            "pending" => Ok(KycStatus::Pending),
            other => Err(ModelError::InvalidField {
                field: "kyc",
                reason: format!("unknown status {other:?}"),
            }),
        }
    }
}

/// Field order is part of the proof input; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: String,
    pub name: String,
    pub kyc: KycStatus,
    #[serde(with = "core_types::iso_millis")]
    pub created: DateTime<Utc>,
}

impl Manufacturer {
    pub fn new(name: &str, kyc: KycStatus, created: DateTime<Utc>) -> Result<Self, ModelError> {
        Self::with_id(core_types::prefixed_id("MAN"), name, kyc, created)
    }

    pub fn with_id(
        id: impl Into<String>,
        name: &str,
        kyc: KycStatus,
        created: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        let id = id.into();
        require("manufacturer id", &id)?;
        Ok(Self {
            id,
            name: require("manufacturer name", name)?,
            kyc,
            created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_manufacturer_gets_prefixed_id() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let m = Manufacturer::new("NovaMed Pharma", KycStatus::Approved, created).unwrap();
        assert!(m.id.starts_with("MAN_"));
        assert_eq!(m.name, "NovaMed Pharma");
    }

    #[test]
    fn blank_name_is_rejected() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let err = Manufacturer::new(" ", KycStatus::Pending, created).unwrap_err();
        assert_eq!(err, ModelError::MissingField("manufacturer name"));
    }

    #[test]
    fn kyc_toggles_and_parses() {
        assert_eq!(KycStatus::Approved.toggled(), KycStatus::Pending);
        assert_eq!(KycStatus::Pending.toggled(), KycStatus::Approved);
        assert_eq!("Approved".parse::<KycStatus>().unwrap(), KycStatus::Approved);
        assert!("revoked".parse::<KycStatus>().is_err());
    }

    #[test]
    fn golden_manufacturer_serialization() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let m = Manufacturer::with_id("MAN_demo", "NovaMed Pharma", KycStatus::Approved, created)
            .unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(
            json,
            r#"{"id":"MAN_demo","name":"NovaMed Pharma","kyc":"approved","created":"2025-01-01T00:00:00.000Z"}"#
        );
    }
}
