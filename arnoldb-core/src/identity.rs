//! Identity types for Arnoldb records

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ValidationError;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// 8-4-4-4-12 hex grouping; any version nibble is accepted.
const IDENTIFIER_REGEX: &str =
    r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(IDENTIFIER_REGEX).expect("valid identifier regex"));

/// Check whether `value` is a syntactically valid remote identifier.
///
/// Only the canonical hyphenated form is accepted. Braced, URN and simple
/// (unhyphenated) UUID spellings are rejected even though they decode to the
/// same 128 bits, because the remote store only ever emits the hyphenated form.
pub fn is_valid_identifier(value: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(value)
}

/// Build a timestamp from unix seconds, as handed over by callers that
/// schedule values with epoch integers.
pub fn timestamp_from_unix_secs(secs: i64) -> Option<Timestamp> {
    Utc.timestamp_opt(secs, 0).single()
}

/// A validated remote identifier.
///
/// The wrapped string is always in the canonical hyphenated form and is kept
/// exactly as the caller or the remote store spelled it, so a caller-supplied
/// id round-trips unchanged. Equality is exact: ids differing only in hex
/// case are different ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Validate `value` as the identifier named `field`.
    pub fn parse(field: &str, value: &str) -> Result<Self, ValidationError> {
        if is_valid_identifier(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(ValidationError::InvalidIdentifier {
                field: field.to_string(),
                value: value.to_string(),
            })
        }
    }

    /// Generate a new timestamp-sortable identifier (UUIDv7).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<Uuid> for Identifier {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

impl TryFrom<String> for Identifier {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identifier::parse("id", &value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_accepts_canonical_forms() {
        assert!(is_valid_identifier("b6785476-146d-43a4-a217-23e186ee7fd3"));
        assert!(is_valid_identifier("B6785476-146D-43A4-A217-23E186EE7FD3"));
        assert!(is_valid_identifier("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_rejects_malformed_forms() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("5"));
        assert!(!is_valid_identifier("b6785476146d43a4a21723e186ee7fd3"));
        assert!(!is_valid_identifier("{b6785476-146d-43a4-a217-23e186ee7fd3}"));
        assert!(!is_valid_identifier("b6785476-146d-43a4-a217-23e186ee7fd"));
        assert!(!is_valid_identifier("g6785476-146d-43a4-a217-23e186ee7fd3"));
        assert!(!is_valid_identifier(" b6785476-146d-43a4-a217-23e186ee7fd3"));
    }

    #[test]
    fn test_parse_reports_field_and_value() {
        let err = Identifier::parse("object_type_id", "5").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidIdentifier {
                field: "object_type_id".to_string(),
                value: "5".to_string(),
            }
        );
        assert!(err.to_string().contains("Not a valid uuid"));
    }

    #[test]
    fn test_parse_keeps_spelling() {
        let raw = "B6785476-146D-43A4-A217-23E186EE7FD3";
        let id = Identifier::parse("id", raw).unwrap();
        assert_eq!(id.as_str(), raw);
    }

    #[test]
    fn test_generated_ids_are_valid_and_distinct() {
        let a = Identifier::generate();
        let b = Identifier::generate();
        assert!(is_valid_identifier(a.as_str()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_timestamp_from_unix_secs() {
        let ts = timestamp_from_unix_secs(1_286_668_800).unwrap();
        assert_eq!(ts.to_rfc3339(), "2010-10-10T00:00:00+00:00");
    }

    proptest! {
        #[test]
        fn prop_every_uuid_is_valid(bytes in any::<[u8; 16]>()) {
            let uuid = Uuid::from_bytes(bytes);
            prop_assert!(is_valid_identifier(&uuid.to_string()));
            prop_assert!(!is_valid_identifier(&uuid.simple().to_string()));
        }
    }
}
