//! The gateway's public operations.
//!
//! Every write follows the same path: validate the caller's input, resolve
//! titles and ids through the shared [`SchemaCache`], check referential rules,
//! commit to the remote store, then update the cache. Nothing is written
//! remotely until every check for the call has passed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use arnoldb_core::{
    require_title, ArnoldbConfig, ArnoldbError, ArnoldbResult, EntityKind, Field, Identifier,
    Object, ReferenceError, RemoteError, RemoteOperation, Timestamp, TypedValue, Value,
    ValueReceipt, ValueRequest, ValueType,
};
use arnoldb_schema::{bounded, BuildReport, RemoteStore, SchemaCache};
use chrono::Utc;
use tracing::Instrument;

/// A `create_values` item that passed every check.
#[derive(Debug)]
struct PlannedValue {
    object_id: Identifier,
    object_type_id: Identifier,
    field_id: Identifier,
    payload: String,
    receipt: ValueReceipt,
}

/// Remote lookups already made within one `create_values` call.
#[derive(Default)]
struct BatchLookups {
    objects: HashMap<Identifier, Option<Object>>,
    fields: HashMap<Identifier, Option<Field>>,
}

/// Validation and schema-resolution gateway in front of a [`RemoteStore`].
///
/// Cheap to share behind an `Arc`; the only cross-request state is the schema
/// cache, which may itself be shared between several gateways.
pub struct Interface {
    remote: Arc<dyn RemoteStore>,
    schema: Arc<SchemaCache>,
    config: ArnoldbConfig,
}

impl Interface {
    /// Create a gateway with its own, empty schema cache.
    pub fn new(remote: Arc<dyn RemoteStore>, config: ArnoldbConfig) -> Self {
        let schema = Arc::new(SchemaCache::new(Arc::clone(&remote), &config));
        Self::with_schema(remote, schema, config)
    }

    /// Create a gateway over an existing schema cache.
    pub fn with_schema(
        remote: Arc<dyn RemoteStore>,
        schema: Arc<SchemaCache>,
        config: ArnoldbConfig,
    ) -> Self {
        Self {
            remote,
            schema,
            config,
        }
    }

    /// Create a gateway and, when `config.build_on_startup` is set, warm the
    /// schema cache before returning.
    pub async fn connect(
        remote: Arc<dyn RemoteStore>,
        config: ArnoldbConfig,
    ) -> ArnoldbResult<Self> {
        config.validate()?;
        let interface = Self::new(remote, config);
        if interface.config.build_on_startup {
            interface.build_schema().await?;
        }
        Ok(interface)
    }

    /// The shared schema cache.
    pub fn schema(&self) -> &Arc<SchemaCache> {
        &self.schema
    }

    pub fn config(&self) -> &ArnoldbConfig {
        &self.config
    }

    /// Issue one remote call. `target` names its inputs for error reporting.
    async fn call<T, F>(
        &self,
        operation: RemoteOperation,
        target: &str,
        call: F,
    ) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        bounded(operation, target, self.config.remote_timeout(), call).await
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Create an object type and cache its title.
    pub async fn create_object_type(&self, title: &str) -> ArnoldbResult<Identifier> {
        let span = tracing::info_span!("create_object_type", %title);
        async move {
            require_title(EntityKind::ObjectType, title)?;

            let id = self
                .call(
                    RemoteOperation::CreateObjectType,
                    title,
                    self.remote.create_object_type(title),
                )
                .await?;
            self.schema.add_table(title, id.as_str()).await?;

            tracing::info!(%id, "Object type created");
            Ok(id)
        }
        .instrument(span)
        .await
    }

    /// Create a field on `object_type_id` and cache its key.
    pub async fn create_field(
        &self,
        object_type_id: &str,
        title: &str,
        value_type: ValueType,
    ) -> ArnoldbResult<Identifier> {
        let span = tracing::info_span!("create_field", %object_type_id, %title, %value_type);
        async move {
            let owner = Identifier::parse("object_type_id", object_type_id)?;
            require_title(EntityKind::Field, title)?;

            let id = self
                .call(
                    RemoteOperation::CreateField,
                    &format!("{owner}/{title}"),
                    self.remote.create_field(&owner, title, value_type),
                )
                .await?;

            // The field exists remotely from here on; a cache miss later is
            // recoverable, losing the id is not.
            if let Err(err) = self
                .schema
                .add_column(title, id.as_str(), owner.as_str())
                .await
            {
                tracing::warn!(%id, error = %err, "Field created but not cached");
            }

            tracing::info!(%id, "Field created");
            Ok(id)
        }
        .instrument(span)
        .await
    }

    /// [`Self::create_field`] with the value type given as its numeric code.
    pub async fn create_field_with_code(
        &self,
        object_type_id: &str,
        title: &str,
        value_type: i32,
    ) -> ArnoldbResult<Identifier> {
        Identifier::parse("object_type_id", object_type_id)?;
        require_title(EntityKind::Field, title)?;
        let value_type = ValueType::try_from(value_type)?;
        self.create_field(object_type_id, title, value_type).await
    }

    /// Create an object of `object_type_id`, with exactly `id` when supplied.
    pub async fn create_object(
        &self,
        object_type_id: &str,
        id: Option<&str>,
    ) -> ArnoldbResult<Identifier> {
        let span = tracing::info_span!("create_object", %object_type_id, requested_id = ?id);
        async move {
            let owner = Identifier::parse("object_type_id", object_type_id)?;
            let requested = id.map(|id| Identifier::parse("id", id)).transpose()?;
            let target = match &requested {
                Some(id) => format!("{owner}/{id}"),
                None => owner.to_string(),
            };

            let id = self
                .call(
                    RemoteOperation::CreateObject,
                    &target,
                    self.remote.create_object(&owner, requested.as_ref()),
                )
                .await?;

            tracing::info!(%id, "Object created");
            Ok(id)
        }
        .instrument(span)
        .await
    }

    /// Record one value per request, all effective at `effective_at` (now when
    /// absent).
    ///
    /// Every request is checked before anything is written, so a bad item
    /// leaves no values behind. Failures carry the index of the offending
    /// request. Receipts echo each request's object id and payload in
    /// submission order.
    pub async fn create_values(
        &self,
        requests: &[ValueRequest],
        effective_at: Option<Timestamp>,
    ) -> ArnoldbResult<Vec<ValueReceipt>> {
        let effective_at = effective_at.unwrap_or_else(Utc::now);
        let span = tracing::info_span!("create_values", items = requests.len(), %effective_at);
        async move {
            let mut lookups = BatchLookups::default();
            let mut planned = Vec::with_capacity(requests.len());
            for (index, request) in requests.iter().enumerate() {
                let plan = self
                    .check_value(request, &mut lookups)
                    .await
                    .map_err(|err| ArnoldbError::batch_item(index, err))?;
                planned.push(plan);
            }

            let mut receipts = Vec::with_capacity(planned.len());
            for (index, plan) in planned.into_iter().enumerate() {
                self.call(
                    RemoteOperation::CreateValue,
                    &format!("{}/{}", plan.object_id, plan.field_id),
                    self.remote.create_value(
                        &plan.object_id,
                        &plan.object_type_id,
                        &plan.field_id,
                        &plan.payload,
                        effective_at,
                    ),
                )
                .await
                .map_err(|err| {
                    if index > 0 {
                        tracing::error!(index, error = %err, "Batch partially committed");
                    }
                    ArnoldbError::batch_item(index, err)
                })?;
                receipts.push(plan.receipt);
            }

            tracing::info!(items = receipts.len(), "Values created");
            Ok(receipts)
        }
        .instrument(span)
        .await
    }

    async fn check_value(
        &self,
        request: &ValueRequest,
        lookups: &mut BatchLookups,
    ) -> ArnoldbResult<PlannedValue> {
        let object_missing = || ReferenceError::ObjectIdNotFound {
            id: request.object_id.clone(),
        };
        if request.object_id.is_empty() {
            return Err(object_missing().into());
        }
        let object_id = Identifier::parse("object_id", &request.object_id)?;
        let object = self
            .lookup_object(&object_id, lookups)
            .await?
            .ok_or_else(object_missing)?;

        let field_missing = || ReferenceError::FieldNotFound {
            id: request.field_id.clone(),
        };
        if request.field_id.is_empty() {
            return Err(field_missing().into());
        }
        let field_id = Identifier::parse("field_id", &request.field_id)?;
        let field = self
            .lookup_field(&field_id, lookups)
            .await?
            .ok_or_else(field_missing)?;

        let not_associated = |object_type_id: &str| {
            ReferenceError::FieldNotAssociatedWithObjectType {
                field_id: request.field_id.clone(),
                object_type_id: object_type_id.to_string(),
                owner: field.object_type_id.to_string(),
            }
        };
        if request.object_type_id.is_empty() {
            return Err(not_associated("").into());
        }
        let object_type_id = Identifier::parse("object_type_id", &request.object_type_id)?;
        if object_type_id != field.object_type_id {
            return Err(not_associated(object_type_id.as_str()).into());
        }
        if object.object_type_id != field.object_type_id {
            return Err(not_associated(object.object_type_id.as_str()).into());
        }

        let value = TypedValue::decode(field.value_type, &request.field_id, &request.value)?;

        Ok(PlannedValue {
            object_id: object.id,
            object_type_id: field.object_type_id,
            field_id: field.id,
            payload: value.encode(),
            receipt: ValueReceipt::from(request),
        })
    }

    async fn lookup_object(
        &self,
        id: &Identifier,
        lookups: &mut BatchLookups,
    ) -> Result<Option<Object>, RemoteError> {
        if let Some(object) = lookups.objects.get(id) {
            return Ok(object.clone());
        }
        let object = self
            .call(
                RemoteOperation::FetchObject,
                id.as_str(),
                self.remote.fetch_object(id),
            )
            .await?;
        lookups.objects.insert(id.clone(), object.clone());
        Ok(object)
    }

    async fn lookup_field(
        &self,
        id: &Identifier,
        lookups: &mut BatchLookups,
    ) -> Result<Option<Field>, RemoteError> {
        if let Some(field) = lookups.fields.get(id) {
            return Ok(field.clone());
        }
        let field = self
            .call(
                RemoteOperation::FetchField,
                id.as_str(),
                self.remote.fetch_field(id),
            )
            .await?;
        lookups.fields.insert(id.clone(), field.clone());
        Ok(field)
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Id of the object type titled `title`, if any. An empty title finds
    /// nothing, and so does a title cached against an id the remote store
    /// could not have issued.
    pub async fn get_object_type(&self, title: &str) -> ArnoldbResult<Option<Identifier>> {
        let span = tracing::debug_span!("get_object_type", %title);
        async move {
            let id = self.schema.resolve_table_id(title).await?;
            Ok(id.and_then(|id| Identifier::parse("object_type_id", &id).ok()))
        }
        .instrument(span)
        .await
    }

    /// Every object type id, read fresh from the remote store.
    pub async fn get_all_object_types(&self) -> ArnoldbResult<Vec<Identifier>> {
        Ok(self
            .call(
                RemoteOperation::ListObjectTypes,
                "",
                self.remote.list_object_types(),
            )
            .await?)
    }

    pub async fn get_objects(&self, object_type_id: &str) -> ArnoldbResult<Vec<Object>> {
        let owner = Identifier::parse("object_type_id", object_type_id)?;
        Ok(self
            .call(
                RemoteOperation::ListObjects,
                owner.as_str(),
                self.remote.list_objects(&owner),
            )
            .await?)
    }

    pub async fn get_fields(&self, object_type_id: &str) -> ArnoldbResult<Vec<Field>> {
        let owner = Identifier::parse("object_type_id", object_type_id)?;
        Ok(self
            .call(
                RemoteOperation::ListFields,
                owner.as_str(),
                self.remote.list_fields(&owner),
            )
            .await?)
    }

    /// Value versions recorded for `object_id`.
    ///
    /// Narrowed to one field when `field_id` is given, and to versions
    /// effective at or before `as_of` when that is given. Results are grouped
    /// by field, latest version first within each field.
    pub async fn get_values(
        &self,
        object_id: &str,
        field_id: Option<&str>,
        as_of: Option<Timestamp>,
    ) -> ArnoldbResult<Vec<Value>> {
        let span = tracing::debug_span!("get_values", %object_id, ?field_id, ?as_of);
        async move {
            let object_id = Identifier::parse("object_id", object_id)?;
            let field_id = field_id
                .map(|id| Identifier::parse("field_id", id))
                .transpose()?;

            let mut values = self
                .call(
                    RemoteOperation::ListValues,
                    object_id.as_str(),
                    self.remote.list_values(&object_id),
                )
                .await?;
            values.retain(|value| {
                field_id.as_ref().map_or(true, |wanted| *wanted == value.field_id)
                    && as_of.map_or(true, |as_of| value.effective_at <= as_of)
            });
            values.sort_by(|a, b| {
                a.field_id
                    .cmp(&b.field_id)
                    .then_with(|| b.effective_at.cmp(&a.effective_at))
            });

            tracing::debug!(count = values.len(), "Values loaded");
            Ok(values)
        }
        .instrument(span)
        .await
    }

    /// Rebuild the schema cache from the remote store.
    pub async fn build_schema(&self) -> ArnoldbResult<BuildReport> {
        self.schema.build().await
    }
}

impl std::fmt::Debug for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interface")
            .field("schema", &self.schema)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
