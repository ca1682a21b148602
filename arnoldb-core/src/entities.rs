//! EAV records held by the remote store

use serde::{Deserialize, Serialize};

use crate::identity::{Identifier, Timestamp};
use crate::title::{normalize_field_title, normalize_table_title};
use crate::value::ValueType;

/// An object type ("table").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    pub id: Identifier,
    /// Title as supplied by the creator.
    pub title: String,
}

impl ObjectType {
    pub fn canonical_title(&self) -> String {
        normalize_table_title(&self.title)
    }
}

/// A field ("column") owned by exactly one object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: Identifier,
    pub title: String,
    pub object_type_id: Identifier,
    pub value_type: ValueType,
}

impl Field {
    pub fn canonical_title(&self) -> String {
        normalize_field_title(&self.title)
    }
}

/// An object ("row"). Objects carry no title and are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: Identifier,
    pub object_type_id: Identifier,
}

/// One time-stamped fact about an object's field ("cell version").
///
/// Values are append-only: several may exist for the same object and field
/// at different `effective_at` instants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub id: Identifier,
    pub object_id: Identifier,
    pub object_type_id: Identifier,
    pub field_id: Identifier,
    pub payload: String,
    pub effective_at: Timestamp,
}

/// Caller input for one value in a `create_values` batch.
///
/// Ids stay plain strings here so that empty and malformed input can be
/// reported with the offending text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRequest {
    pub object_id: String,
    pub object_type_id: String,
    pub field_id: String,
    pub value: String,
}

impl ValueRequest {
    pub fn new(
        object_id: impl Into<String>,
        object_type_id: impl Into<String>,
        field_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            object_type_id: object_type_id.into(),
            field_id: field_id.into(),
            value: value.into(),
        }
    }
}

/// Result entry of a committed value: the object id and the stored payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueReceipt {
    pub id: String,
    pub value: String,
}

impl From<&ValueRequest> for ValueReceipt {
    fn from(request: &ValueRequest) -> Self {
        Self {
            id: request.object_id.clone(),
            value: request.value.clone(),
        }
    }
}
