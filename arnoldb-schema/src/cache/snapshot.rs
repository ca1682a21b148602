//! Bidirectional title/id maps.
//!
//! A [`SchemaSnapshot`] is one generation of the cache. Table maps and field
//! maps sit behind separate locks so table writes never block field readers.
//! A full build produces a fresh snapshot that replaces the old one wholesale.

use std::collections::HashMap;

use arnoldb_core::decompose_field_key;
use tokio::sync::RwLock;

/// A title <-> id bijection.
///
/// Inserting a title that is already mapped to another id drops the stale
/// reverse entry, and inserting an id that already carries another title drops
/// the stale forward entry, so both directions always agree.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BiMap {
    by_title: HashMap<String, String>,
    by_id: HashMap<String, String>,
}

impl BiMap {
    pub fn insert(&mut self, title: String, id: String) {
        if let Some(previous_id) = self.by_title.get(&title) {
            if previous_id != &id {
                self.by_id.remove(previous_id);
            }
        }
        if let Some(previous_title) = self.by_id.get(&id) {
            if previous_title != &title {
                self.by_title.remove(previous_title);
            }
        }
        self.by_title.insert(title.clone(), id.clone());
        self.by_id.insert(id, title);
    }

    pub fn id_of(&self, title: &str) -> Option<&String> {
        self.by_title.get(title)
    }

    pub fn title_of(&self, id: &str) -> Option<&String> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.by_title.iter()
    }
}

/// Field keys of `table` mapped by their bare field component.
pub(crate) fn columns_of(fields: &BiMap, table: &str) -> HashMap<String, String> {
    fields
        .iter()
        .filter_map(|(key, id)| match decompose_field_key(key) {
            Some((t, field)) if t == table => Some((field.to_string(), id.clone())),
            _ => None,
        })
        .collect()
}

/// A single mapping write, recorded so it can be replayed onto a new generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Mapping {
    Table { title: String, id: String },
    Column { key: String, id: String },
}

/// One generation of the schema cache.
#[derive(Debug, Default)]
pub(crate) struct SchemaSnapshot {
    pub(crate) tables: RwLock<BiMap>,
    pub(crate) fields: RwLock<BiMap>,
}

impl SchemaSnapshot {
    pub(crate) fn from_maps(tables: BiMap, fields: BiMap) -> Self {
        Self {
            tables: RwLock::new(tables),
            fields: RwLock::new(fields),
        }
    }
}

/// Apply `mapping` to plain maps (used while a new generation is still private).
pub(crate) fn apply(tables: &mut BiMap, fields: &mut BiMap, mapping: Mapping) {
    match mapping {
        Mapping::Table { title, id } => tables.insert(title, id),
        Mapping::Column { key, id } => fields.insert(key, id),
    }
}
