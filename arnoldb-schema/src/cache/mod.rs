//! Schema cache.
//!
//! Maps object type titles and field keys to remote ids in both directions so
//! the gateway can resolve names without a round trip per request.

mod schema;
mod single_flight;
mod snapshot;
mod stats;

pub use schema::{BuildReport, SchemaCache};
pub use single_flight::{Flight, SingleFlight};
pub use snapshot::BiMap;
pub use stats::SchemaStats;
