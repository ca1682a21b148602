//! Error types for Arnoldb operations

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::value::ValueType;

/// Record kinds held by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    ObjectType,
    Field,
    Object,
    Value,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::ObjectType => "object type",
            EntityKind::Field => "field",
            EntityKind::Object => "object",
            EntityKind::Value => "value",
        };
        f.write_str(name)
    }
}

/// Remote store calls, named so a retry wrapper can tell what failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteOperation {
    CreateObjectType,
    CreateField,
    CreateObject,
    CreateValue,
    FetchObjectTypeTitle,
    FetchObject,
    FetchField,
    ListObjectTypes,
    ListFields,
    ListObjects,
    ListValues,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteOperation::CreateObjectType => "create_object_type",
            RemoteOperation::CreateField => "create_field",
            RemoteOperation::CreateObject => "create_object",
            RemoteOperation::CreateValue => "create_value",
            RemoteOperation::FetchObjectTypeTitle => "fetch_object_type_title",
            RemoteOperation::FetchObject => "fetch_object",
            RemoteOperation::FetchField => "fetch_field",
            RemoteOperation::ListObjectTypes => "list_object_types",
            RemoteOperation::ListFields => "list_fields",
            RemoteOperation::ListObjects => "list_objects",
            RemoteOperation::ListValues => "list_values",
        };
        f.write_str(name)
    }
}

/// Input validation errors. Deterministic given the input, never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title required for {entity}")]
    TitleRequired { entity: EntityKind },

    #[error("Not a valid uuid for {field}: {value:?}")]
    InvalidIdentifier { field: String, value: String },

    #[error("Invalid value type code: {code}")]
    InvalidValueType { code: i32 },

    #[error("Wrong type for field {field_id}: expected {expected}, got {payload:?}")]
    PayloadTypeMismatch {
        field_id: String,
        expected: ValueType,
        payload: String,
    },
}

/// Referential integrity errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Object Id Not Found: {id:?}")]
    ObjectIdNotFound { id: String },

    #[error("Field Not Found: {id:?}")]
    FieldNotFound { id: String },

    #[error("Field not associated with given Object Type: field {field_id} belongs to {owner}, got {object_type_id:?}")]
    FieldNotAssociatedWithObjectType {
        field_id: String,
        object_type_id: String,
        owner: String,
    },

    #[error("Object Type Not Found: {id:?}")]
    ObjectTypeNotFound { id: String },
}

/// Errors raised by, or on the way to, the remote store.
///
/// `target` names the inputs of the failed call (a title, an id, or
/// `owner/title` pairs) so a retry wrapper can reissue it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote store unavailable during {operation}({target}): {reason}")]
    Unavailable {
        operation: RemoteOperation,
        target: String,
        reason: String,
    },

    #[error("Remote store rejected {operation}({target}): {reason}")]
    Rejected {
        operation: RemoteOperation,
        target: String,
        reason: String,
    },
}

impl RemoteError {
    pub fn unavailable(
        operation: RemoteOperation,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Unavailable {
            operation,
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn rejected(
        operation: RemoteOperation,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            operation,
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn operation(&self) -> RemoteOperation {
        match self {
            Self::Unavailable { operation, .. } | Self::Rejected { operation, .. } => *operation,
        }
    }

    /// Inputs of the failed call.
    pub fn target(&self) -> &str {
        match self {
            Self::Unavailable { target, .. } | Self::Rejected { target, .. } => target,
        }
    }

    /// Fill in the call's inputs when the transport did not report them.
    pub fn with_target(mut self, inputs: &str) -> Self {
        match &mut self {
            Self::Unavailable { target, .. } | Self::Rejected { target, .. } => {
                if target.is_empty() {
                    *target = inputs.to_string();
                }
            }
        }
        self
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file: {reason}")]
    Io { reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },
}

/// Flat discriminant for matching on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    TitleRequired,
    InvalidIdentifier,
    InvalidValueType,
    PayloadTypeMismatch,
    ObjectIdNotFound,
    FieldNotFound,
    FieldNotAssociatedWithObjectType,
    ObjectTypeNotFound,
    RemoteUnavailable,
    RemoteRejected,
    Config,
}

/// Master error type for all Arnoldb errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArnoldbError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Value request #{index} failed: {source}")]
    BatchItemFailed {
        index: usize,
        #[source]
        source: Box<ArnoldbError>,
    },
}

impl ArnoldbError {
    /// Wrap a per-item failure with its position in the submitted batch.
    pub fn batch_item(index: usize, source: impl Into<ArnoldbError>) -> Self {
        Self::BatchItemFailed {
            index,
            source: Box::new(source.into()),
        }
    }

    /// The kind of the innermost failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArnoldbError::Validation(err) => match err {
                ValidationError::TitleRequired { .. } => ErrorKind::TitleRequired,
                ValidationError::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
                ValidationError::InvalidValueType { .. } => ErrorKind::InvalidValueType,
                ValidationError::PayloadTypeMismatch { .. } => ErrorKind::PayloadTypeMismatch,
            },
            ArnoldbError::Reference(err) => match err {
                ReferenceError::ObjectIdNotFound { .. } => ErrorKind::ObjectIdNotFound,
                ReferenceError::FieldNotFound { .. } => ErrorKind::FieldNotFound,
                ReferenceError::FieldNotAssociatedWithObjectType { .. } => {
                    ErrorKind::FieldNotAssociatedWithObjectType
                }
                ReferenceError::ObjectTypeNotFound { .. } => ErrorKind::ObjectTypeNotFound,
            },
            ArnoldbError::Remote(RemoteError::Unavailable { .. }) => ErrorKind::RemoteUnavailable,
            ArnoldbError::Remote(RemoteError::Rejected { .. }) => ErrorKind::RemoteRejected,
            ArnoldbError::Config(_) => ErrorKind::Config,
            ArnoldbError::BatchItemFailed { source, .. } => source.kind(),
        }
    }

    /// Only transport failures and timeouts are worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::RemoteUnavailable
    }

    /// Position of the failing item when raised by a batch operation.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            ArnoldbError::BatchItemFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Result type alias for Arnoldb operations.
pub type ArnoldbResult<T> = Result<T, ArnoldbError>;

// =============================================================================
// TESTS
// =============================================================================
