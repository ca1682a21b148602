//! Arnoldb Test Utilities
//!
//! Shared test infrastructure for the Arnoldb workspace:
//! - Proptest generators for identifiers, titles and payloads
//! - Fixtures that seed an in-memory remote store
//! - Assertions for Arnoldb-specific error checks

pub use arnoldb_schema::{InMemoryRemoteStore, RemoteStore, SchemaCache};

pub use arnoldb_core::{
    ArnoldbConfig, ArnoldbError, ArnoldbResult, ErrorKind, Field, Identifier, Object,
    ObjectType, Timestamp, TypedValue, Value, ValueReceipt, ValueRequest, ValueType,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    /// Generate a well-formed identifier string, in either letter case.
    pub fn arb_identifier_str() -> impl Strategy<Value = String> {
        "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
    }

    /// Generate an [`Identifier`].
    pub fn arb_identifier() -> impl Strategy<Value = Identifier> {
        arb_identifier_str().prop_map(|s| {
            Identifier::parse("id", &s).unwrap_or_else(|_| Identifier::generate())
        })
    }

    /// Generate a string that is never a well-formed identifier.
    pub fn arb_malformed_identifier() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            "[0-9]{1,6}",
            "[0-9a-f]{32}",
            "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{11}",
            "[g-z]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        ]
    }

    /// Generate a non-empty title without a field key separator.
    pub fn arb_title() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9_ ]{0,23}"
    }

    /// Generate a field title that may itself contain the key separator.
    pub fn arb_dotted_field_title() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,8}(\\.[a-z0-9_]{1,8}){0,2}"
    }

    pub fn arb_value_type() -> impl Strategy<Value = ValueType> {
        prop_oneof![
            Just(ValueType::Integer),
            Just(ValueType::Float),
            Just(ValueType::String),
        ]
    }

    /// Generate a payload together with the value type it decodes as.
    pub fn arb_typed_value() -> impl Strategy<Value = TypedValue> {
        prop_oneof![
            any::<i64>().prop_map(TypedValue::Integer),
            (-1.0e9f64..1.0e9f64).prop_map(TypedValue::Float),
            "[ -~]{0,32}".prop_map(TypedValue::String),
        ]
    }

    /// Generate a timestamp between 2000 and 2100.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (946_684_800i64..4_102_444_800i64).prop_map(|secs| {
            Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
        })
    }

    /// Generate a valid configuration.
    pub fn arb_valid_config() -> impl Strategy<Value = ArnoldbConfig> {
        (1u64..120_000, any::<bool>(), any::<bool>()).prop_map(
            |(remote_timeout_ms, build_on_startup, log_json)| ArnoldbConfig {
                remote_timeout_ms,
                build_on_startup,
                log_json,
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    /// Configuration with a short remote timeout, so failure tests stay fast.
    pub fn fast_config() -> ArnoldbConfig {
        ArnoldbConfig::default().with_remote_timeout(Duration::from_millis(250))
    }

    pub fn memory_store() -> Arc<InMemoryRemoteStore> {
        Arc::new(InMemoryRemoteStore::new())
    }

    /// Empty schema cache in front of `store`.
    pub fn schema_cache(store: &Arc<InMemoryRemoteStore>) -> SchemaCache {
        let remote: Arc<dyn RemoteStore> = store.clone();
        SchemaCache::new(remote, &fast_config())
    }

    /// A "Profiles" object type with one field per value type and one object.
    #[derive(Debug, Clone)]
    pub struct ProfilesFixture {
        pub object_type_id: Identifier,
        pub name_field: Identifier,
        pub age_field: Identifier,
        pub modifier_field: Identifier,
        pub object_id: Identifier,
    }

    impl ProfilesFixture {
        /// A request for `value` on `field` of the fixture object.
        pub fn request(&self, field: &Identifier, value: &str) -> ValueRequest {
            ValueRequest::new(
                self.object_id.as_str(),
                self.object_type_id.as_str(),
                field.as_str(),
                value,
            )
        }

        /// One valid request per field: "John Kimble", 30, 0.5.
        pub fn john_kimble(&self) -> Vec<ValueRequest> {
            vec![
                self.request(&self.name_field, "John Kimble"),
                self.request(&self.age_field, "30"),
                self.request(&self.modifier_field, "0.5"),
            ]
        }
    }

    /// Seed `store` directly, bypassing any cache.
    pub async fn seed_profiles(store: &InMemoryRemoteStore) -> ArnoldbResult<ProfilesFixture> {
        let object_type_id = store.create_object_type("Profiles").await?;
        let name_field = store
            .create_field(&object_type_id, "name", ValueType::String)
            .await?;
        let age_field = store
            .create_field(&object_type_id, "age", ValueType::Integer)
            .await?;
        let modifier_field = store
            .create_field(&object_type_id, "modifier", ValueType::Float)
            .await?;
        let object_id = store.create_object(&object_type_id, None).await?;

        Ok(ProfilesFixture {
            object_type_id,
            name_field,
            age_field,
            modifier_field,
            object_id,
        })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

/// Assert that `result` failed with an error of `kind`.
#[macro_export]
macro_rules! assert_error_kind {
    ($result:expr, $kind:expr) => {
        match $result {
            Ok(value) => panic!("expected {:?} error, got Ok({:?})", $kind, value),
            Err(err) => assert_eq!(
                $crate::ArnoldbError::kind(&err),
                $kind,
                "unexpected error: {}",
                err
            ),
        }
    };
}

/// Assert that `value` is a well-formed identifier.
pub fn assert_valid_identifier(value: &str) {
    assert!(
        arnoldb_core::is_valid_identifier(value),
        "not a valid identifier: {value:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_generated_identifiers_are_valid(id in arb_identifier_str()) {
            prop_assert!(arnoldb_core::is_valid_identifier(&id));
        }

        #[test]
        fn test_malformed_identifiers_are_invalid(id in arb_malformed_identifier()) {
            prop_assert!(!arnoldb_core::is_valid_identifier(&id));
        }

        #[test]
        fn test_generated_configs_validate(config in arb_valid_config()) {
            prop_assert!(config.validate().is_ok());
        }
    }

    #[tokio::test]
    async fn test_seed_profiles() {
        let store = fixtures::memory_store();
        let profiles = fixtures::seed_profiles(&store).await.unwrap();

        let fields = store.list_fields(&profiles.object_type_id).await.unwrap();
        assert_eq!(fields.len(), 3);
        assert_valid_identifier(profiles.object_id.as_str());
        assert_eq!(profiles.john_kimble().len(), 3);
    }
}
