//! Arnoldb schema layer: the remote store contract and the schema cache that
//! sits in front of it.

pub mod cache;
pub mod memory;
pub mod remote;

pub use cache::{BiMap, BuildReport, Flight, SchemaCache, SchemaStats, SingleFlight};
pub use memory::InMemoryRemoteStore;
pub use remote::{bounded, RemoteStore};
