//! Arnoldb Gateway
//!
//! Validation and schema-resolution layer in front of the Arnoldb remote EAV
//! store. Callers name object types and fields by title; the gateway checks
//! identifiers, titles, referential rules and payload types before anything
//! reaches the remote store, and keeps a shared title <-> id cache warm.

pub mod interface;
pub mod telemetry;

pub use interface::Interface;
pub use telemetry::{init_tracing, DEFAULT_FILTER};

pub use arnoldb_core::{
    ArnoldbConfig, ArnoldbError, ArnoldbResult, ErrorKind, Field, Identifier, Object, Timestamp,
    Value, ValueReceipt, ValueRequest, ValueType,
};
pub use arnoldb_schema::{BuildReport, InMemoryRemoteStore, RemoteStore, SchemaCache, SchemaStats};
