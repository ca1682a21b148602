//! The schema cache: title <-> id mappings for object types and fields.
//!
//! # Concurrency
//!
//! - Reads share a read lock on the region they touch (tables or fields) and
//!   never observe a half-written entry.
//! - Table writes and field writes take independent locks.
//! - A miss on a table id during [`SchemaCache::resolve_table_title`] is
//!   coalesced: concurrent misses for the same id share one remote fetch and
//!   the mapping is written before any waiter is released. Misses on a table
//!   title during [`SchemaCache::resolve_table_id`] are coalesced the same
//!   way, keyed on the normalized title.
//! - Every remote call is bounded by the configured timeout. A failed or
//!   expired call never writes to the cache.
//! - [`SchemaCache::build`] assembles a new generation privately and swaps it
//!   in under the generation write lock, so readers see the whole old or the
//!   whole new state. Writes that land while a build is running are journaled
//!   and replayed onto the new generation before the swap.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arnoldb_core::{
    compose_field_key, is_valid_identifier, normalize_table_title, require_title, ArnoldbConfig,
    ArnoldbResult, EntityKind, Identifier, ReferenceError, RemoteError, RemoteOperation,
    TitleKind,
};
use tokio::sync::{Mutex, RwLock};

use super::single_flight::{Flight, SingleFlight};
use super::snapshot::{apply, columns_of, BiMap, Mapping, SchemaSnapshot};
use super::stats::{SchemaStats, StatsRecorder};
use crate::remote::{bounded, RemoteStore};

/// Outcome of a full build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub object_types: usize,
    pub fields: usize,
    /// Writes made while the build ran, replayed onto the new generation.
    pub replayed: usize,
}

/// Process-wide, injectable title/id cache in front of a [`RemoteStore`].
pub struct SchemaCache {
    remote: Arc<dyn RemoteStore>,
    remote_timeout: Duration,
    generation: RwLock<Arc<SchemaSnapshot>>,
    /// `Some` while a build is running.
    build_journal: Mutex<Option<Vec<Mapping>>>,
    build_lock: Mutex<()>,
    title_fetches: SingleFlight<String, Option<String>>,
    id_lookups: SingleFlight<String, Option<String>>,
    stats: StatsRecorder,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new(remote: Arc<dyn RemoteStore>, config: &ArnoldbConfig) -> Self {
        Self {
            remote,
            remote_timeout: config.remote_timeout(),
            generation: RwLock::new(Arc::new(SchemaSnapshot::default())),
            build_journal: Mutex::new(None),
            build_lock: Mutex::new(()),
            title_fetches: SingleFlight::new(),
            id_lookups: SingleFlight::new(),
            stats: StatsRecorder::default(),
        }
    }

    /// Remote store this cache mirrors.
    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    pub fn remote_timeout(&self) -> Duration {
        self.remote_timeout
    }

    async fn current(&self) -> Arc<SchemaSnapshot> {
        Arc::clone(&*self.generation.read().await)
    }

    /// Write one mapping into the live generation, journaling it if a build runs.
    async fn record(&self, mapping: Mapping) {
        let generation = self.generation.read().await;
        match &mapping {
            Mapping::Table { title, id } => {
                generation.tables.write().await.insert(title.clone(), id.clone());
            }
            Mapping::Column { key, id } => {
                generation.fields.write().await.insert(key.clone(), id.clone());
            }
        }
        if let Some(journal) = self.build_journal.lock().await.as_mut() {
            journal.push(mapping);
        }
    }

    /// Map an object type title to `id`.
    ///
    /// Repeating an identical pair is a no-op; reusing a title with another id
    /// replaces the mapping.
    pub async fn add_table(&self, title: &str, id: &str) -> ArnoldbResult<()> {
        require_title(EntityKind::ObjectType, title)?;
        let title = normalize_table_title(title);
        tracing::debug!(%title, %id, "Caching object type");
        self.record(Mapping::Table {
            title,
            id: id.to_string(),
        })
        .await;
        Ok(())
    }

    /// Map a field title on the object type `owning_table_id` to `field_id`.
    ///
    /// The owner's title is resolved through [`Self::resolve_table_title`],
    /// which may hit the remote store. Returns the composed field key.
    pub async fn add_column(
        &self,
        field_title: &str,
        field_id: &str,
        owning_table_id: &str,
    ) -> ArnoldbResult<String> {
        require_title(EntityKind::Field, field_title)?;
        let table = self
            .resolve_table_title(owning_table_id)
            .await?
            .ok_or_else(|| ReferenceError::ObjectTypeNotFound {
                id: owning_table_id.to_string(),
            })?;

        let key = compose_field_key(&table, field_title);
        tracing::debug!(%key, %field_id, "Caching field");
        self.record(Mapping::Column {
            key: key.clone(),
            id: field_id.to_string(),
        })
        .await;
        Ok(key)
    }

    /// Look up an id by title. Column titles are composed `table.field` keys.
    pub async fn get_id(&self, kind: TitleKind, title: &str) -> Option<String> {
        let key = kind.normalize(title);
        let generation = self.current().await;
        let found = match kind {
            TitleKind::Table => generation.tables.read().await.id_of(&key).cloned(),
            TitleKind::Column => generation.fields.read().await.id_of(&key).cloned(),
        };
        self.stats.lookup(found.is_some());
        found
    }

    /// Reverse lookup: canonical title (or field key) of `id`.
    pub async fn get_title(&self, kind: TitleKind, id: &str) -> Option<String> {
        let generation = self.current().await;
        let found = match kind {
            TitleKind::Table => generation.tables.read().await.title_of(id).cloned(),
            TitleKind::Column => generation.fields.read().await.title_of(id).cloned(),
        };
        self.stats.lookup(found.is_some());
        found
    }

    /// Fields of `table_title`, keyed by bare field title.
    pub async fn get_columns(&self, table_title: &str) -> HashMap<String, String> {
        let table = normalize_table_title(table_title);
        let generation = self.current().await;
        let fields = generation.fields.read().await;
        columns_of(&fields, &table)
    }

    /// Canonical title of the object type `id`, reading through to the remote
    /// store on a miss.
    ///
    /// Ids that are not well-formed cannot exist remotely and resolve to `None`
    /// without a remote call.
    pub async fn resolve_table_title(&self, id: &str) -> ArnoldbResult<Option<String>> {
        if let Some(title) = self.get_title(TitleKind::Table, id).await {
            return Ok(Some(title));
        }
        Ok(self.fetch_table_title(id).await?)
    }

    /// Id of the object type titled `title`, reading through to the remote
    /// store on a miss.
    ///
    /// A miss lists the remote object types and resolves the titles of those
    /// not yet cached, so this is expensive the first time an unknown title is
    /// asked for. A cached id that is not well-formed was never issued by the
    /// remote store and counts as a miss.
    pub async fn resolve_table_id(&self, title: &str) -> ArnoldbResult<Option<String>> {
        if title.is_empty() {
            return Ok(None);
        }
        if let Some(id) = self.get_id(TitleKind::Table, title).await {
            if is_valid_identifier(&id) {
                return Ok(Some(id));
            }
        }

        let wanted = normalize_table_title(title);
        let (result, flight) = self
            .id_lookups
            .run(wanted.clone(), || self.scan_table_id(&wanted))
            .await;
        if flight == Flight::Follower {
            self.stats.coalesced();
        }
        Ok(result?)
    }

    async fn cached_table_title(&self, id: &str) -> Option<String> {
        self.current().await.tables.read().await.title_of(id).cloned()
    }

    async fn cached_table_id(&self, title: &str) -> Option<String> {
        self.current().await.tables.read().await.id_of(title).cloned()
    }

    /// Coalesced remote fetch of the title of `id`, cached on success.
    async fn fetch_table_title(&self, id: &str) -> Result<Option<String>, RemoteError> {
        let Ok(remote_id) = Identifier::parse("object_type_id", id) else {
            return Ok(None);
        };

        let (result, flight) = self
            .title_fetches
            .run(id.to_string(), || async {
                // A leader that lost the race to a just-finished flight.
                if let Some(title) = self.cached_table_title(id).await {
                    return Ok(Some(title));
                }

                self.stats.remote_fetch();
                let title = bounded(
                    RemoteOperation::FetchObjectTypeTitle,
                    id,
                    self.remote_timeout,
                    self.remote.fetch_object_type_title(&remote_id),
                )
                .await?;

                match title {
                    Some(title) => {
                        let title = normalize_table_title(&title);
                        self.record(Mapping::Table {
                            title: title.clone(),
                            id: id.to_string(),
                        })
                        .await;
                        Ok(Some(title))
                    }
                    None => Ok(None),
                }
            })
            .await;

        if flight == Flight::Follower {
            self.stats.coalesced();
        }
        result
    }

    /// Scan the remote object types for the normalized title `wanted`.
    async fn scan_table_id(&self, wanted: &str) -> Result<Option<String>, RemoteError> {
        if let Some(id) = self.cached_table_id(wanted).await {
            if is_valid_identifier(&id) {
                return Ok(Some(id));
            }
        }

        let ids = bounded(
            RemoteOperation::ListObjectTypes,
            "",
            self.remote_timeout,
            self.remote.list_object_types(),
        )
        .await?;

        let mut found = None;
        for id in ids {
            let title = match self.cached_table_title(id.as_str()).await {
                Some(title) => Some(title),
                None => self.fetch_table_title(id.as_str()).await?,
            };
            if title.as_deref() == Some(wanted) {
                // Later ids win, matching last-write-wins on creation.
                found = Some(id.into_string());
            }
        }

        if let Some(id) = &found {
            self.record(Mapping::Table {
                title: wanted.to_string(),
                id: id.clone(),
            })
            .await;
        }
        Ok(found)
    }

    /// Replace the cache contents with the remote store's current object types
    /// and fields.
    pub async fn build(&self) -> ArnoldbResult<BuildReport> {
        let _building = self.build_lock.lock().await;
        *self.build_journal.lock().await = Some(Vec::new());

        let loaded = self.load_remote().await;
        let (mut tables, mut fields) = match loaded {
            Ok(maps) => maps,
            Err(err) => {
                *self.build_journal.lock().await = None;
                tracing::warn!(error = %err, "Schema build failed, keeping current cache");
                return Err(err);
            }
        };

        let mut report = BuildReport {
            object_types: tables.len(),
            fields: fields.len(),
            replayed: 0,
        };

        let mut generation = self.generation.write().await;
        let journal = self.build_journal.lock().await.take().unwrap_or_default();
        report.replayed = journal.len();
        for mapping in journal {
            apply(&mut tables, &mut fields, mapping);
        }
        *generation = Arc::new(SchemaSnapshot::from_maps(tables, fields));
        drop(generation);

        self.stats.build();
        tracing::info!(
            object_types = report.object_types,
            fields = report.fields,
            replayed = report.replayed,
            "Schema cache built"
        );
        Ok(report)
    }

    async fn load_remote(&self) -> ArnoldbResult<(BiMap, BiMap)> {
        let mut tables = BiMap::default();
        let mut fields = BiMap::default();

        let ids = bounded(
            RemoteOperation::ListObjectTypes,
            "",
            self.remote_timeout,
            self.remote.list_object_types(),
        )
        .await?;

        for id in ids {
            self.stats.remote_fetch();
            let title = bounded(
                RemoteOperation::FetchObjectTypeTitle,
                id.as_str(),
                self.remote_timeout,
                self.remote.fetch_object_type_title(&id),
            )
            .await?;
            let Some(title) = title else {
                continue;
            };
            let table = normalize_table_title(&title);

            let owned = bounded(
                RemoteOperation::ListFields,
                id.as_str(),
                self.remote_timeout,
                self.remote.list_fields(&id),
            )
            .await?;
            for field in owned {
                fields.insert(
                    compose_field_key(&table, &field.title),
                    field.id.into_string(),
                );
            }
            tables.insert(table, id.into_string());
        }

        Ok((tables, fields))
    }

    /// Drop every mapping. The remote store is not touched.
    pub async fn reset(&self) {
        let mut generation = self.generation.write().await;
        *generation = Arc::new(SchemaSnapshot::default());
        tracing::debug!("Schema cache reset");
    }

    /// Number of cached object types and fields.
    pub async fn len(&self) -> (usize, usize) {
        let generation = self.current().await;
        let tables = generation.tables.read().await.len();
        let fields = generation.fields.read().await.len();
        (tables, fields)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == (0, 0)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> SchemaStats {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("remote_timeout", &self.remote_timeout)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
