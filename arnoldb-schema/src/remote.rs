//! Remote store client contract.
//!
//! The remote EAV store is a black box reached over some RPC transport. This
//! crate only needs the call shapes below and their success/error duality;
//! the transport, its retry policy and the wire format belong to whoever
//! implements the trait.

use std::future::Future;
use std::time::Duration;

use arnoldb_core::{
    Field, Identifier, Object, RemoteError, RemoteOperation, Timestamp, Value, ValueType,
};
use async_trait::async_trait;

/// Async client for the remote EAV store.
///
/// Every method is a single remote call. Implementations must be thread-safe;
/// the gateway issues calls concurrently across unrelated requests.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create an object type and return its server-assigned id.
    async fn create_object_type(&self, title: &str) -> Result<Identifier, RemoteError>;

    /// Create a field on an existing object type.
    async fn create_field(
        &self,
        object_type_id: &Identifier,
        title: &str,
        value_type: ValueType,
    ) -> Result<Identifier, RemoteError>;

    /// Create an object, with exactly `id` when supplied.
    async fn create_object(
        &self,
        object_type_id: &Identifier,
        id: Option<&Identifier>,
    ) -> Result<Identifier, RemoteError>;

    /// Append one value version.
    async fn create_value(
        &self,
        object_id: &Identifier,
        object_type_id: &Identifier,
        field_id: &Identifier,
        payload: &str,
        effective_at: Timestamp,
    ) -> Result<Identifier, RemoteError>;

    /// Title of an object type, as it was created.
    async fn fetch_object_type_title(&self, id: &Identifier) -> Result<Option<String>, RemoteError>;

    /// Ids of every object type known to the store.
    async fn list_object_types(&self) -> Result<Vec<Identifier>, RemoteError>;

    async fn fetch_object(&self, id: &Identifier) -> Result<Option<Object>, RemoteError>;

    async fn fetch_field(&self, id: &Identifier) -> Result<Option<Field>, RemoteError>;

    /// Fields owned by an object type. Unknown types yield an empty list.
    async fn list_fields(&self, object_type_id: &Identifier) -> Result<Vec<Field>, RemoteError>;

    /// Objects of an object type. Unknown types yield an empty list.
    async fn list_objects(&self, object_type_id: &Identifier) -> Result<Vec<Object>, RemoteError>;

    /// Every value version recorded for an object.
    async fn list_values(&self, object_id: &Identifier) -> Result<Vec<Value>, RemoteError>;
}

/// Run a remote call under `timeout`.
///
/// `target` names the call's inputs and is attached to any error the call
/// returns. An expired call is reported as [`RemoteError::Unavailable`] so
/// callers can treat it like any other retryable transport failure.
pub async fn bounded<T, F>(
    operation: RemoteOperation,
    target: &str,
    timeout: Duration,
    call: F,
) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    let result = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(|err| err.with_target(target)),
        Err(_) => Err(RemoteError::unavailable(
            operation,
            target,
            format!("timed out after {}ms", timeout.as_millis()),
        )),
    };

    if let Err(err) = &result {
        tracing::warn!(%operation, %target, error = %err, "Remote call failed");
    }
    result
}
