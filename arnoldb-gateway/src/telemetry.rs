//! Tracing subscriber setup.
//!
//! Filtering follows `RUST_LOG` when set; otherwise the gateway and the
//! schema cache log at `debug` and everything else at `info`.

use arnoldb_core::ArnoldbConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "arnoldb_gateway=debug,arnoldb_schema=debug,info";

/// Install the global subscriber: JSON lines when `config.log_json`, plain
/// text otherwise.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &ArnoldbConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::info!(
        remote_timeout_ms = config.remote_timeout_ms,
        json = config.log_json,
        "Tracing initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let config = ArnoldbConfig::default();
        // Whichever call wins, the other one must report the conflict.
        let first = init_tracing(&config);
        let second = init_tracing(&config);
        assert!(first.is_err() || second.is_err());
    }
}
