//! Title normalization
//!
//! Object type ("table") titles are stored uppercased, field ("column") titles
//! lowercased. Internal whitespace and underscores are never touched, so
//! `"g FACTOR"` becomes `"g factor"` and `"OfFices_ArounD"` becomes
//! `"OFFICES_AROUND"`.
//!
//! Fields are keyed by the composite `TABLE.field` string. The first `.` is
//! the separator: table titles containing a `.` cannot be told apart from the
//! field component, while field titles containing a `.` decompose fine.

use serde::{Deserialize, Serialize};

use crate::error::{EntityKind, ValidationError};

/// Separator between the table and field components of a field key.
pub const FIELD_KEY_SEPARATOR: char = '.';

/// Which of the two title namespaces a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleKind {
    /// Object type titles.
    Table,
    /// Composite `TABLE.field` keys.
    Column,
}

impl TitleKind {
    /// Normalize `title` for this namespace.
    pub fn normalize(self, title: &str) -> String {
        match self {
            TitleKind::Table => normalize_table_title(title),
            TitleKind::Column => match decompose_field_key(title) {
                Some((table, field)) => compose_field_key(table, field),
                None => normalize_field_title(title),
            },
        }
    }
}

/// Canonical form of an object type title.
pub fn normalize_table_title(title: &str) -> String {
    title.to_uppercase()
}

/// Canonical form of a field title.
pub fn normalize_field_title(title: &str) -> String {
    title.to_lowercase()
}

/// Compose the cache key for `field_title` on `table_title`.
pub fn compose_field_key(table_title: &str, field_title: &str) -> String {
    let table = normalize_table_title(table_title);
    let field = normalize_field_title(field_title);
    let mut key = String::with_capacity(table.len() + field.len() + 1);
    key.push_str(&table);
    key.push(FIELD_KEY_SEPARATOR);
    key.push_str(&field);
    key
}

/// Split a field key on its first separator.
///
/// Returns `None` when the key has no separator at all.
pub fn decompose_field_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(FIELD_KEY_SEPARATOR)
}

/// Reject an empty title for a record of kind `entity`.
pub fn require_title(entity: EntityKind, title: &str) -> Result<&str, ValidationError> {
    if title.is_empty() {
        Err(ValidationError::TitleRequired { entity })
    } else {
        Ok(title)
    }
}
