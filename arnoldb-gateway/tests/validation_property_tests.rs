//! Property-based tests for gateway input validation.
//!
//! For any malformed identifier or empty title, the gateway SHALL fail before
//! issuing a single remote call.

use std::sync::Arc;

use arnoldb_gateway::{ErrorKind, Interface, RemoteStore, ValueType};
use arnoldb_test_utils::fixtures::{fast_config, memory_store};
use arnoldb_test_utils::generators::{arb_malformed_identifier, arb_title, arb_value_type};
use proptest::prelude::*;
use tokio::runtime::Runtime;

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_malformed_object_type_id_never_reaches_remote(
        object_type_id in arb_malformed_identifier(),
        title in arb_title(),
        value_type in arb_value_type(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = memory_store();
            let remote: Arc<dyn RemoteStore> = store.clone();
            let interface = Interface::new(remote, fast_config());

            let field = interface.create_field(&object_type_id, &title, value_type).await;
            prop_assert_eq!(field.map_err(|e| e.kind()), Err(ErrorKind::InvalidIdentifier));

            let object = interface.create_object(&object_type_id, None).await;
            prop_assert_eq!(object.map_err(|e| e.kind()), Err(ErrorKind::InvalidIdentifier));

            prop_assert_eq!(store.total_calls(), 0);
            Ok(())
        })?;
    }

    #[test]
    fn prop_created_object_type_resolves_by_any_casing(title in arb_title()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = memory_store();
            let remote: Arc<dyn RemoteStore> = store.clone();
            let interface = Interface::new(remote, fast_config());

            let id = interface
                .create_object_type(&title)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let found = interface
                .get_object_type(&title.to_lowercase())
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(found, Some(id));
            Ok(())
        })?;
    }

    #[test]
    fn prop_unknown_value_type_codes_are_rejected(code in 3i32..i32::MAX) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = memory_store();
            let remote: Arc<dyn RemoteStore> = store.clone();
            let interface = Interface::new(remote, fast_config());
            let profiles = interface
                .create_object_type("Profiles")
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            let result = interface
                .create_field_with_code(profiles.as_str(), "value", code)
                .await;
            prop_assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::InvalidValueType));
            prop_assert!(ValueType::try_from(code).is_err());
            Ok(())
        })?;
    }
}
