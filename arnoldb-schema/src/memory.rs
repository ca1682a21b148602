//! In-memory remote store.
//!
//! Behaves like the real remote store for the purposes of the gateway: it
//! assigns ids, enforces its own referential rules and rejects what the remote
//! store would reject. Tests use the call counters, the latency knob and the
//! availability switch to exercise caching and failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use arnoldb_core::{
    Field, Identifier, Object, ObjectType, RemoteError, RemoteOperation, Timestamp, Value,
    ValueType,
};
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::remote::RemoteStore;

#[derive(Debug, Default)]
struct StoreState {
    object_types: HashMap<Identifier, ObjectType>,
    /// Creation order, so listings are stable.
    object_type_order: Vec<Identifier>,
    fields: HashMap<Identifier, Field>,
    field_order: Vec<Identifier>,
    objects: HashMap<Identifier, Object>,
    object_order: Vec<Identifier>,
    values: Vec<Value>,
}

/// In-memory implementation of [`RemoteStore`].
#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    state: RwLock<StoreState>,
    calls: DashMap<RemoteOperation, u64>,
    latency_ms: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryRemoteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Make every call fail with [`RemoteError::Unavailable`] until switched back.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of calls made for `operation`, failed ones included.
    pub fn call_count(&self, operation: RemoteOperation) -> u64 {
        self.calls.get(&operation).map(|count| *count).unwrap_or(0)
    }

    /// Total number of calls made.
    pub fn total_calls(&self) -> u64 {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    pub fn reset_call_counts(&self) {
        self.calls.clear();
    }

    /// Number of stored value versions.
    pub async fn value_count(&self) -> usize {
        self.state.read().await.values.len()
    }

    /// Clear all stored data.
    pub async fn clear(&self) {
        *self.state.write().await = StoreState::default();
        self.calls.clear();
    }

    async fn enter(&self, operation: RemoteOperation) -> Result<(), RemoteError> {
        *self.calls.entry(operation).or_insert(0) += 1;

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RemoteError::unavailable(operation, "", "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn create_object_type(&self, title: &str) -> Result<Identifier, RemoteError> {
        self.enter(RemoteOperation::CreateObjectType).await?;
        if title.is_empty() {
            return Err(RemoteError::rejected(
                RemoteOperation::CreateObjectType,
                "",
                "title must not be empty",
            ));
        }

        let id = Identifier::generate();
        let mut state = self.state.write().await;
        state.object_types.insert(
            id.clone(),
            ObjectType {
                id: id.clone(),
                title: title.to_string(),
            },
        );
        state.object_type_order.push(id.clone());
        Ok(id)
    }

    async fn create_field(
        &self,
        object_type_id: &Identifier,
        title: &str,
        value_type: ValueType,
    ) -> Result<Identifier, RemoteError> {
        self.enter(RemoteOperation::CreateField).await?;
        let mut state = self.state.write().await;
        if !state.object_types.contains_key(object_type_id) {
            return Err(RemoteError::rejected(
                RemoteOperation::CreateField,
                "",
                format!("unknown object type {object_type_id}"),
            ));
        }
        if title.is_empty() {
            return Err(RemoteError::rejected(
                RemoteOperation::CreateField,
                "",
                "title must not be empty",
            ));
        }

        let id = Identifier::generate();
        state.fields.insert(
            id.clone(),
            Field {
                id: id.clone(),
                title: title.to_string(),
                object_type_id: object_type_id.clone(),
                value_type,
            },
        );
        state.field_order.push(id.clone());
        Ok(id)
    }

    async fn create_object(
        &self,
        object_type_id: &Identifier,
        id: Option<&Identifier>,
    ) -> Result<Identifier, RemoteError> {
        self.enter(RemoteOperation::CreateObject).await?;
        let mut state = self.state.write().await;
        if !state.object_types.contains_key(object_type_id) {
            return Err(RemoteError::rejected(
                RemoteOperation::CreateObject,
                "",
                format!("unknown object type {object_type_id}"),
            ));
        }

        let id = match id {
            Some(id) if state.objects.contains_key(id) => {
                return Err(RemoteError::rejected(
                    RemoteOperation::CreateObject,
                    "",
                    format!("object {id} already exists"),
                ));
            }
            Some(id) => id.clone(),
            None => Identifier::generate(),
        };

        state.objects.insert(
            id.clone(),
            Object {
                id: id.clone(),
                object_type_id: object_type_id.clone(),
            },
        );
        state.object_order.push(id.clone());
        Ok(id)
    }

    async fn create_value(
        &self,
        object_id: &Identifier,
        object_type_id: &Identifier,
        field_id: &Identifier,
        payload: &str,
        effective_at: Timestamp,
    ) -> Result<Identifier, RemoteError> {
        self.enter(RemoteOperation::CreateValue).await?;
        let mut state = self.state.write().await;
        if !state.objects.contains_key(object_id) {
            return Err(RemoteError::rejected(
                RemoteOperation::CreateValue,
                "",
                format!("unknown object {object_id}"),
            ));
        }
        match state.fields.get(field_id) {
            None => {
                return Err(RemoteError::rejected(
                    RemoteOperation::CreateValue,
                    "",
                    format!("unknown field {field_id}"),
                ));
            }
            Some(field) if &field.object_type_id != object_type_id => {
                return Err(RemoteError::rejected(
                    RemoteOperation::CreateValue,
                    "",
                    format!("field {field_id} does not belong to {object_type_id}"),
                ));
            }
            Some(_) => {}
        }

        let id = Identifier::generate();
        state.values.push(Value {
            id: id.clone(),
            object_id: object_id.clone(),
            object_type_id: object_type_id.clone(),
            field_id: field_id.clone(),
            payload: payload.to_string(),
            effective_at,
        });
        Ok(id)
    }

    async fn fetch_object_type_title(
        &self,
        id: &Identifier,
    ) -> Result<Option<String>, RemoteError> {
        self.enter(RemoteOperation::FetchObjectTypeTitle).await?;
        let state = self.state.read().await;
        Ok(state.object_types.get(id).map(|ot| ot.title.clone()))
    }

    async fn list_object_types(&self) -> Result<Vec<Identifier>, RemoteError> {
        self.enter(RemoteOperation::ListObjectTypes).await?;
        Ok(self.state.read().await.object_type_order.clone())
    }

    async fn fetch_object(&self, id: &Identifier) -> Result<Option<Object>, RemoteError> {
        self.enter(RemoteOperation::FetchObject).await?;
        Ok(self.state.read().await.objects.get(id).cloned())
    }

    async fn fetch_field(&self, id: &Identifier) -> Result<Option<Field>, RemoteError> {
        self.enter(RemoteOperation::FetchField).await?;
        Ok(self.state.read().await.fields.get(id).cloned())
    }

    async fn list_fields(&self, object_type_id: &Identifier) -> Result<Vec<Field>, RemoteError> {
        self.enter(RemoteOperation::ListFields).await?;
        let state = self.state.read().await;
        Ok(state
            .field_order
            .iter()
            .filter_map(|id| state.fields.get(id))
            .filter(|f| &f.object_type_id == object_type_id)
            .cloned()
            .collect())
    }

    async fn list_objects(&self, object_type_id: &Identifier) -> Result<Vec<Object>, RemoteError> {
        self.enter(RemoteOperation::ListObjects).await?;
        let state = self.state.read().await;
        Ok(state
            .object_order
            .iter()
            .filter_map(|id| state.objects.get(id))
            .filter(|o| &o.object_type_id == object_type_id)
            .cloned()
            .collect())
    }

    async fn list_values(&self, object_id: &Identifier) -> Result<Vec<Value>, RemoteError> {
        self.enter(RemoteOperation::ListValues).await?;
        let state = self.state.read().await;
        Ok(state
            .values
            .iter()
            .filter(|v| &v.object_id == object_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_create_and_fetch_object_type() {
        let store = InMemoryRemoteStore::new();
        let id = store.create_object_type("Profiles").await.unwrap();

        assert_eq!(
            store.fetch_object_type_title(&id).await.unwrap(),
            Some("Profiles".to_string())
        );
        assert_eq!(store.list_object_types().await.unwrap(), vec![id]);
        assert_eq!(store.call_count(RemoteOperation::CreateObjectType), 1);
        assert_eq!(store.call_count(RemoteOperation::FetchObjectTypeTitle), 1);
    }

    #[tokio::test]
    async fn test_field_requires_known_object_type() {
        let store = InMemoryRemoteStore::new();
        let err = store
            .create_field(&Identifier::generate(), "name", ValueType::String)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_explicit_object_id_round_trips_once() {
        let store = InMemoryRemoteStore::new();
        let ot = store.create_object_type("Profiles").await.unwrap();
        let wanted = Identifier::parse("id", "b6785476-146d-43a4-a217-23e186ee7fd3").unwrap();

        let id = store.create_object(&ot, Some(&wanted)).await.unwrap();
        assert_eq!(id, wanted);

        let err = store.create_object(&ot, Some(&wanted)).await.unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_value_versions_accumulate() {
        let store = InMemoryRemoteStore::new();
        let ot = store.create_object_type("Profiles").await.unwrap();
        let field = store.create_field(&ot, "age", ValueType::Integer).await.unwrap();
        let object = store.create_object(&ot, None).await.unwrap();

        store
            .create_value(&object, &ot, &field, "30", Utc::now())
            .await
            .unwrap();
        store
            .create_value(&object, &ot, &field, "31", Utc::now())
            .await
            .unwrap();

        let values = store.list_values(&object).await.unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(store.value_count().await, 2);
    }

    #[tokio::test]
    async fn test_unavailable_switch() {
        let store = InMemoryRemoteStore::new();
        store.set_available(false);
        let err = store.list_object_types().await.unwrap_err();
        assert!(matches!(err, RemoteError::Unavailable { .. }));

        store.set_available(true);
        assert!(store.list_object_types().await.is_ok());
        assert_eq!(store.call_count(RemoteOperation::ListObjectTypes), 2);
    }
}
