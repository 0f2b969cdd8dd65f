use chrono::Duration;

use crate::{EngineError, EngineResult};

pub const MAX_ATTEMPTS_ENV: &str = "MEDVERIFY_MAX_ATTEMPTS";
pub const LOCK_MINUTES_ENV: &str = "MEDVERIFY_LOCK_MINUTES";
pub const VERIFY_BASE_URL_ENV: &str = "MEDVERIFY_VERIFY_BASE_URL";

/// Invalid-code threshold and how long a batch stays locked once it is hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lock_duration: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub lockout: LockoutPolicy,
    /// Page that QR links point at; the batch id is appended as `?verify=<id>`.
    pub verify_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lockout: LockoutPolicy::default(),
            verify_base_url: "http://localhost:8080/".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(MAX_ATTEMPTS_ENV) {
            let n: u32 = raw.trim().parse().map_err(|_| {
                EngineError::InvalidInput(format!("{MAX_ATTEMPTS_ENV} must be a positive integer"))
            })?;
            if n == 0 {
                return Err(EngineError::InvalidInput(format!(
                    "{MAX_ATTEMPTS_ENV} must be at least 1"
                )));
            }
            cfg.lockout.max_attempts = n;
        }

        if let Some(raw) = lookup(LOCK_MINUTES_ENV) {
            let minutes: i64 = raw.trim().parse().map_err(|_| {
                EngineError::InvalidInput(format!("{LOCK_MINUTES_ENV} must be an integer"))
            })?;
            if minutes <= 0 {
                return Err(EngineError::InvalidInput(format!(
                    "{LOCK_MINUTES_ENV} must be positive"
                )));
            }
            cfg.lockout.lock_duration = Duration::minutes(minutes);
        }

        if let Some(url) = lookup(VERIFY_BASE_URL_ENV) {
            if !url.trim().is_empty() {
                cfg.verify_base_url = url.trim().to_string();
            }
        }

        Ok(cfg)
    }
}
