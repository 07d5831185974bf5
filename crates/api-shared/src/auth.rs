//! API key checks for the HTTP surface.

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Header carrying the caller's tenant id.
pub const TENANT_HEADER: &str = "x-tenant-id";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("API_KEY not set in environment")]
    NotConfigured,
    #[error("missing x-api-key header")]
    Missing,
    #[error("invalid API key")]
    Invalid,
}

/// Validates the provided API key against the key configured at startup.
///
/// Returns `Ok(())` if the key matches, or an error if it is invalid or missing.
pub fn validate_api_key(provided_key: Option<&str>, expected_key: Option<&str>) -> Result<(), AuthError> {
    let expected_key = expected_key.ok_or(AuthError::NotConfigured)?;
    let provided_key = provided_key.ok_or(AuthError::Missing)?;
    if provided_key == expected_key {
        Ok(())
    } else {
        Err(AuthError::Invalid)
    }
}

/// Normalises the raw `API_KEY` value; blank means unset.
pub fn api_key_from_env_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_key_passes() {
        assert_eq!(validate_api_key(Some("k1"), Some("k1")), Ok(()));
    }

    #[test]
    fn wrong_or_missing_key_fails() {
        assert_eq!(validate_api_key(Some("k2"), Some("k1")), Err(AuthError::Invalid));
        assert_eq!(validate_api_key(None, Some("k1")), Err(AuthError::Missing));
        assert_eq!(validate_api_key(Some("k1"), None), Err(AuthError::NotConfigured));
    }

    #[test]
    fn blank_env_key_is_unset() {
        assert_eq!(api_key_from_env_value(Some("  ".into())), None);
        assert_eq!(api_key_from_env_value(Some(" abc ".into())), Some("abc".into()));
    }
}
