//! Input validation and request limits for the Anonium client
//!
//! This module holds the limits applied to values we send to the backend
//! (page sizes, exclude lists, base URLs, storage keys) and the depth guard
//! used when decoding nested comment JSON.

use crate::error::{AnoniumError, Result};

/// Maximum comment nesting accepted when decoding server JSON
///
/// serde_json stops at 128 levels of nesting and each comment level costs
/// an object plus a `children` array, so deeper trees never reach us anyway.
pub const MAX_TREE_DEPTH: usize = 64;

/// Default number of children requested per "load more"
pub const DEFAULT_CHILDREN_LIMIT: usize = 10;

/// Maximum number of children the backend will return per page
pub const MAX_CHILDREN_LIMIT: usize = 100;

/// Maximum number of ids sent in `exclude_ids`
///
/// The list is an optimization only; past this size it is truncated to keep
/// the request URL within common proxy limits.
pub const MAX_EXCLUDE_IDS: usize = 200;

/// Maximum length of a storage key
pub const MAX_STORAGE_KEY_LENGTH: usize = 128;

/// Validation functions for outgoing values
pub struct Validator;

impl Validator {
    /// Validate a children page size
    pub fn validate_children_limit(limit: usize) -> Result<()> {
        if limit == 0 {
            return Err(AnoniumError::invalid_input(
                "Children limit must be at least 1",
            ));
        }
        if limit > MAX_CHILDREN_LIMIT {
            return Err(AnoniumError::invalid_input(format!(
                "Children limit {} exceeds maximum of {}",
                limit, MAX_CHILDREN_LIMIT
            )));
        }
        Ok(())
    }

    /// Clamp a children page size into the accepted range
    pub fn clamp_children_limit(limit: usize) -> usize {
        limit.clamp(1, MAX_CHILDREN_LIMIT)
    }

    /// Validate an API base URL
    pub fn validate_base_url(url: &str) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AnoniumError::config("API base URL is empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AnoniumError::config(format!(
                "API base URL must start with http:// or https://, got '{}'",
                url
            )));
        }
        if url.chars().any(char::is_whitespace) {
            return Err(AnoniumError::config("API base URL contains whitespace"));
        }
        Ok(())
    }

    /// Validate a storage key
    pub fn validate_storage_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(AnoniumError::storage("Storage key is empty"));
        }
        if key.len() > MAX_STORAGE_KEY_LENGTH {
            return Err(AnoniumError::storage(format!(
                "Storage key too long: {} bytes exceeds maximum of {} bytes",
                key.len(),
                MAX_STORAGE_KEY_LENGTH
            )));
        }

        // Keys double as file names for the on-disk store
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AnoniumError::storage(format!(
                "Storage key '{}' contains unsupported characters",
                key
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_limit_validation() {
        assert!(Validator::validate_children_limit(1).is_ok());
        assert!(Validator::validate_children_limit(MAX_CHILDREN_LIMIT).is_ok());
        assert!(Validator::validate_children_limit(0).is_err());
        assert!(Validator::validate_children_limit(MAX_CHILDREN_LIMIT + 1).is_err());

        assert_eq!(Validator::clamp_children_limit(0), 1);
        assert_eq!(Validator::clamp_children_limit(5000), MAX_CHILDREN_LIMIT);
    }

    #[test]
    fn test_base_url_validation() {
        assert!(Validator::validate_base_url("https://anonium.example").is_ok());
        assert!(Validator::validate_base_url("http://127.0.0.1:8000").is_ok());
        assert!(Validator::validate_base_url("").is_err());
        assert!(Validator::validate_base_url("ftp://x").is_err());
        assert!(Validator::validate_base_url("http://a b").is_err());
    }

    #[test]
    fn test_storage_key_validation() {
        assert!(Validator::validate_storage_key("comment_collapsed_42").is_ok());
        assert!(Validator::validate_storage_key("").is_err());
        assert!(Validator::validate_storage_key("../etc/passwd").is_err());
        assert!(Validator::validate_storage_key(&"k".repeat(MAX_STORAGE_KEY_LENGTH + 1)).is_err());
    }
}
