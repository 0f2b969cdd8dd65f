use crate::ModelError;

/// Returns the trimmed value, or `MissingField` when it is empty.
pub fn require(field: &'static str, value: &str) -> Result<String, ModelError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModelError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn validate_otp(otp: &str) -> Result<(), ModelError> {
    if otp.len() != crate::OTP_LEN || !otp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ModelError::InvalidField {
            field: "otp",
            reason: format!("expected {} digits", crate::OTP_LEN),
        });
    }
    Ok(())
}

pub fn validate_hash(field: &'static str, hash: &str) -> Result<(), ModelError> {
    if !core_types::is_hex_digest(hash) {
        return Err(ModelError::InvalidField {
            field,
            reason: "expected 64 hex characters".to_string(),
        });
    }
    Ok(())
}
