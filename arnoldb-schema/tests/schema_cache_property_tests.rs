//! Property-based tests for schema cache lookups.
//!
//! Titles are case-insensitive at lookup time, and a field title keeps every
//! `.` after the first one of its composed key.

use std::sync::Arc;

use arnoldb_core::{ArnoldbConfig, TitleKind};
use arnoldb_schema::{InMemoryRemoteStore, RemoteStore, SchemaCache};
use proptest::prelude::*;
use tokio::runtime::Runtime;

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn empty_cache() -> SchemaCache {
    let remote: Arc<dyn RemoteStore> = Arc::new(InMemoryRemoteStore::new());
    SchemaCache::new(remote, &ArnoldbConfig::default())
}

fn arb_table_title() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_ ]{0,15}"
}

fn arb_dotted_field_title() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,8}(\\.[A-Za-z0-9_]{1,8}){0,2}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_dotted_field_titles_survive_add_column(
        table in arb_table_title(),
        field in arb_dotted_field_title(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let cache = empty_cache();
            cache
                .add_table(&table, "t1")
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let key = cache
                .add_column(&field, "f1", "t1")
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(&key, &format!("{}.{}", table.to_uppercase(), field.to_lowercase()));

            let bare = field.to_lowercase();
            let lower = cache.get_columns(&table.to_lowercase()).await;
            let upper = cache.get_columns(&table.to_uppercase()).await;
            prop_assert_eq!(lower.get(&bare).map(String::as_str), Some("f1"));
            prop_assert_eq!(&lower, &upper);

            let found = cache.get_id(TitleKind::Column, &format!("{table}.{field}")).await;
            prop_assert_eq!(found.as_deref(), Some("f1"));
            Ok(())
        })?;
    }

    #[test]
    fn prop_table_lookups_ignore_title_case(
        title in arb_table_title(),
        id in "[0-9a-f]{8}",
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let cache = empty_cache();
            cache
                .add_table(&title, &id)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            let lower = cache.get_id(TitleKind::Table, &title.to_lowercase()).await;
            let upper = cache.get_id(TitleKind::Table, &title.to_uppercase()).await;
            prop_assert_eq!(lower.as_deref(), Some(id.as_str()));
            prop_assert_eq!(upper.as_deref(), Some(id.as_str()));
            prop_assert_eq!(
                cache.get_title(TitleKind::Table, &id).await,
                Some(title.to_uppercase())
            );
            Ok(())
        })?;
    }

    #[test]
    fn prop_last_table_write_wins(
        title in arb_table_title(),
        ids in prop::collection::vec("[0-9a-f]{8}", 1..6),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let cache = empty_cache();
            for id in &ids {
                cache
                    .add_table(&title, id)
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
            }

            let last = ids.last().map(String::as_str);
            let got = cache.get_id(TitleKind::Table, &title).await;
            prop_assert_eq!(got.as_deref(), last);
            prop_assert_eq!(cache.len().await, (1, 0));
            Ok(())
        })?;
    }
}
