use std::sync::Arc;

use crate::auth::AuthManager;
use crate::config::Config;
use crate::error::Result;
use crate::http_client::{build_client, GraphHttpClient};
use crate::logging;

/// Entry point for every Graph / SharePoint operation.
///
/// Owns the configuration, the token cache, and the request executor. The
/// endpoint wrappers in [`crate::api`] are methods on this type.
pub struct GrafapClient {
    config: Arc<Config>,
    auth_manager: Arc<AuthManager>,
    http: GraphHttpClient,
}

impl GrafapClient {
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let client = build_client(&config.http)?;
        let auth_manager = Arc::new(AuthManager::new(config.clone(), client.clone()));
        let http = GraphHttpClient::new(&config, auth_manager.clone(), client);

        tracing::debug!(
            max_attempts = http.retry_policy().max_attempts,
            "Client initialized"
        );

        Ok(Self {
            config,
            auth_manager,
            http,
        })
    }

    /// Build from `.env` and the process environment.
    ///
    /// Also installs the fmt subscriber at `LOG_LEVEL` unless the host
    /// application already set one up.
    pub fn from_env() -> Result<Self> {
        let config = Config::load();
        if logging::init_from_config(&config).is_err() {
            tracing::debug!("Tracing subscriber already installed, keeping it");
        }
        Self::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth_manager(&self) -> &AuthManager {
        &self.auth_manager
    }

    pub fn http(&self) -> &GraphHttpClient {
        &self.http
    }

    /// `{GRAPH_BASE_URL}/{segments...}`
    pub(crate) fn graph_url(&self, path: &str) -> Result<String> {
        Ok(join_url(self.config.graph_base_url()?, path))
    }
}

/// Join a base URL and a relative path with exactly one slash
pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}

/// Quote a string as an OData literal: `it's` -> `'it''s'`
pub(crate) fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
