//! Arnoldb Core - Entity Types
//!
//! Pure data structures shared by every other crate: identifiers, title
//! normalization, the EAV entity records, value types and the error surface.
//! Nothing in here talks to the remote store.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;
pub mod title;
pub mod value;

pub use config::ArnoldbConfig;
pub use entities::{Field, Object, ObjectType, Value, ValueReceipt, ValueRequest};
pub use error::{
    ArnoldbError, ArnoldbResult, ConfigError, EntityKind, ErrorKind, ReferenceError, RemoteError,
    RemoteOperation, ValidationError,
};
pub use identity::{
    is_valid_identifier, timestamp_from_unix_secs, Identifier, Timestamp,
};
pub use title::{
    compose_field_key, decompose_field_key, normalize_field_title, normalize_table_title,
    require_title, TitleKind,
};
pub use value::{TypedValue, ValueType};
