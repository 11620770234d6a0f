use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{ApiError, Result};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Fails instead of panicking when a
/// subscriber is already installed, so embedding applications keep their own.
pub fn init_tracing(level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| ApiError::Internal(anyhow!("Failed to initialise logging: {}", e)))
}

/// [`init_tracing`] at the configured `LOG_LEVEL`
pub fn init_from_config(config: &Config) -> Result<()> {
    init_tracing(&config.log_level)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_level_without_rust_log() {
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(env_filter("WARN").to_string(), "warn");
        }
    }

    #[test]
    fn test_second_init_is_an_error() {
        let config = Config {
            log_level: "debug".to_string(),
            ..Default::default()
        };
        // The first call may race with other tests; only the later outcomes are certain
        let _ = init_from_config(&config);
        assert!(matches!(init_tracing("info"), Err(ApiError::Internal(_))));
        assert!(matches!(init_from_config(&config), Err(ApiError::Internal(_))));
    }
}
