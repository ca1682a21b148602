//! Arnoldb gateway walkthrough.
//!
//! Runs the gateway against the in-memory remote store: creates a Profiles
//! object type, records John Kimble's values in the past, present and future,
//! and prints what each point in time sees as JSON.

use std::sync::Arc;

use arnoldb_core::timestamp_from_unix_secs;
use arnoldb_gateway::{
    init_tracing, ArnoldbConfig, InMemoryRemoteStore, Interface, RemoteStore, ValueRequest,
    ValueType,
};
use chrono::{Duration, Utc};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ArnoldbConfig::from_env();
    config.validate()?;
    init_tracing(&config)?;

    let remote: Arc<dyn RemoteStore> = Arc::new(InMemoryRemoteStore::new());
    let interface = Interface::connect(remote, config).await?;

    let profiles = interface.create_object_type("Profiles").await?;
    let name = interface
        .create_field(profiles.as_str(), "name", ValueType::String)
        .await?;
    let age = interface
        .create_field(profiles.as_str(), "age", ValueType::Integer)
        .await?;
    let modifier = interface
        .create_field(profiles.as_str(), "modifier", ValueType::Float)
        .await?;
    let kimble = interface.create_object(profiles.as_str(), None).await?;

    let values = |name_value: &str, age_value: &str, modifier_value: &str| {
        vec![
            ValueRequest::new(kimble.as_str(), profiles.as_str(), name.as_str(), name_value),
            ValueRequest::new(kimble.as_str(), profiles.as_str(), age.as_str(), age_value),
            ValueRequest::new(
                kimble.as_str(),
                profiles.as_str(),
                modifier.as_str(),
                modifier_value,
            ),
        ]
    };

    let past = timestamp_from_unix_secs(1_286_668_800);
    let future = Utc::now() + Duration::days(365);
    interface
        .create_values(&values("old John Kimble", "3000", "9.81"), past)
        .await?;
    interface
        .create_values(&values("John Kimble", "30", "0.5"), None)
        .await?;
    interface
        .create_values(&values("terminator", "-2000", "3.14"), Some(future))
        .await?;

    let history = interface.get_values(kimble.as_str(), None, None).await?;
    let today = interface
        .get_values(kimble.as_str(), None, Some(Utc::now()))
        .await?;

    println!("{}", serde_json::to_string_pretty(&history)?);
    println!("{}", serde_json::to_string_pretty(&today)?);
    println!(
        "{}",
        serde_json::to_string_pretty(&interface.get_fields(profiles.as_str()).await?)?
    );
    tracing::info!(stats = ?interface.schema().stats(), "Demo finished");
    Ok(())
}
