//! Field value types and the payload codec.
//!
//! The remote store keeps every payload as a string and tags fields with a
//! small integer type code. At this boundary the tag becomes a closed enum and
//! payloads become [`TypedValue`], with explicit encode/decode to the wire
//! string.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ValueType {
    Integer = 0,
    Float = 1,
    String = 2,
}

impl ValueType {
    /// Wire code of this type.
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ValueType::Integer),
            1 => Some(ValueType::Float),
            2 => Some(ValueType::String),
            _ => None,
        }
    }
}

impl TryFrom<i32> for ValueType {
    type Error = ValidationError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        ValueType::from_code(code).ok_or(ValidationError::InvalidValueType { code })
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::String => "string",
        };
        f.write_str(name)
    }
}

/// A payload decoded according to its field's declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl TypedValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::Integer(_) => ValueType::Integer,
            TypedValue::Float(_) => ValueType::Float,
            TypedValue::String(_) => ValueType::String,
        }
    }

    /// Wire form of the payload.
    pub fn encode(&self) -> String {
        match self {
            TypedValue::Integer(v) => v.to_string(),
            TypedValue::Float(v) => v.to_string(),
            TypedValue::String(v) => v.clone(),
        }
    }

    /// Decode `payload` as `value_type`.
    ///
    /// Integers accept an optional sign and decimal digits. Floats accept
    /// anything Rust's float parser does except non-finite values, which the
    /// remote store cannot compare. Strings accept everything.
    pub fn decode(
        value_type: ValueType,
        field_id: &str,
        payload: &str,
    ) -> Result<Self, ValidationError> {
        let mismatch = || ValidationError::PayloadTypeMismatch {
            field_id: field_id.to_string(),
            expected: value_type,
            payload: payload.to_string(),
        };

        match value_type {
            ValueType::Integer => payload
                .parse::<i64>()
                .map(TypedValue::Integer)
                .map_err(|_| mismatch()),
            ValueType::Float => match payload.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(TypedValue::Float(v)),
                _ => Err(mismatch()),
            },
            ValueType::String => Ok(TypedValue::String(payload.to_string())),
        }
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Integer(v)
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        TypedValue::Float(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::String(v.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        TypedValue::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_codes() {
        assert_eq!(ValueType::try_from(0), Ok(ValueType::Integer));
        assert_eq!(ValueType::try_from(1), Ok(ValueType::Float));
        assert_eq!(ValueType::try_from(2), Ok(ValueType::String));
        assert_eq!(
            ValueType::try_from(99),
            Err(ValidationError::InvalidValueType { code: 99 })
        );
        assert_eq!(ValueType::String.code(), 2);
    }

    #[test]
    fn test_decode_accepts_conforming_payloads() {
        assert_eq!(
            TypedValue::decode(ValueType::Integer, "f", "-2000"),
            Ok(TypedValue::Integer(-2000))
        );
        assert_eq!(
            TypedValue::decode(ValueType::Float, "f", "9.81"),
            Ok(TypedValue::Float(9.81))
        );
        assert_eq!(
            TypedValue::decode(ValueType::Float, "f", "30"),
            Ok(TypedValue::Float(30.0))
        );
        assert_eq!(
            TypedValue::decode(ValueType::String, "f", "John Kimble"),
            Ok(TypedValue::String("John Kimble".to_string()))
        );
    }

    #[test]
    fn test_decode_rejects_wrong_type() {
        let err = TypedValue::decode(ValueType::Integer, "age", "0.5").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::PayloadTypeMismatch {
                expected: ValueType::Integer,
                ..
            }
        ));
        assert!(TypedValue::decode(ValueType::Float, "modifier", "terminator").is_err());
        assert!(TypedValue::decode(ValueType::Float, "modifier", "NaN").is_err());
        assert!(TypedValue::decode(ValueType::Integer, "age", "").is_err());
    }

    #[test]
    fn test_encode_matches_wire_form() {
        assert_eq!(TypedValue::from(30_i64).encode(), "30");
        assert_eq!(TypedValue::from(0.5_f64).encode(), "0.5");
        assert_eq!(TypedValue::from("old John Kimble").encode(), "old John Kimble");
        assert_eq!(TypedValue::from(2.5_f64).value_type(), ValueType::Float);
    }
}
