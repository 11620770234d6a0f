use std::time::Duration;

use crate::error::{ApiError, Result};

pub const DEFAULT_GRANT_TYPE: &str = "client_credentials";
pub const DEFAULT_GRAPH_API_ROOT: &str = "https://graph.microsoft.com/v1.0";

/// Which token endpoint the SharePoint surface uses
#[derive(Clone, Debug, PartialEq)]
pub enum TokenEndpointVersion {
    /// `/oauth2/v2.0/token` with a `scope`
    V2,
    /// `/oauth2/token` with a `resource`
    V1,
}

/// Graph API settings
#[derive(Clone, Debug, Default)]
pub struct GraphSettings {
    pub login_base_url: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub grant_type: Option<String>,
    pub scopes: Option<String>,
    /// Sites collection, e.g. `https://graph.microsoft.com/v1.0/sites/`
    pub base_url: Option<String>,
    /// Tenant-wide root, used for `/users`
    pub api_root: Option<String>,
}

/// SharePoint REST API settings
#[derive(Clone, Debug)]
pub struct SharePointSettings {
    pub login_base_url: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub grant_type: Option<String>,
    pub site: Option<String>,
    pub scopes: Option<String>,
    pub token_endpoint: TokenEndpointVersion,
}

impl Default for SharePointSettings {
    fn default() -> Self {
        Self {
            login_base_url: None,
            tenant_id: None,
            client_id: None,
            client_secret: None,
            grant_type: None,
            site: None,
            scopes: None,
            token_endpoint: TokenEndpointVersion::V2,
        }
    }
}

/// Timeouts and retry budget for outbound calls
#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub file_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_attempts: u32,
    pub retry_initial_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            file_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            max_attempts: 5,
            retry_initial_delay: Duration::from_millis(4000),
            retry_max_delay: Duration::from_millis(10_000),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub graph: GraphSettings,
    pub sharepoint: SharePointSettings,
    pub http: HttpSettings,

    /// Seconds before expiry at which a cached token is already treated as stale
    pub token_refresh_threshold: u64,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph: GraphSettings::default(),
            sharepoint: SharePointSettings::default(),
            http: HttpSettings::default(),
            token_refresh_threshold: 0,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `.env` (if present) and the process environment
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = HttpSettings::default();

        let graph = GraphSettings {
            login_base_url: get("GRAPH_LOGIN_BASE_URL"),
            tenant_id: get("GRAPH_TENANT_ID"),
            client_id: get("GRAPH_CLIENT_ID"),
            client_secret: get("GRAPH_CLIENT_SECRET"),
            grant_type: get("GRAPH_GRANT_TYPE"),
            scopes: get("GRAPH_SCOPES"),
            base_url: get("GRAPH_BASE_URL"),
            api_root: get("GRAPH_API_ROOT"),
        };

        let sharepoint = SharePointSettings {
            login_base_url: get("SP_LOGIN_BASE_URL"),
            tenant_id: get("SP_TENANT_ID"),
            client_id: get("SP_CLIENT_ID"),
            client_secret: get("SP_CLIENT_SECRET"),
            grant_type: get("SP_GRANT_TYPE"),
            site: get("SP_SITE"),
            scopes: get("SP_SCOPES"),
            token_endpoint: parse_token_endpoint(&get("SP_TOKEN_ENDPOINT").unwrap_or_default()),
        };

        let http = HttpSettings {
            request_timeout: get("HTTP_REQUEST_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            file_timeout: get("HTTP_FILE_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.file_timeout),
            connect_timeout: get("HTTP_CONNECT_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            max_attempts: get("HTTP_MAX_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_attempts),
            retry_initial_delay: get("HTTP_RETRY_INITIAL_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_initial_delay),
            retry_max_delay: get("HTTP_RETRY_MAX_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_max_delay),
        };

        Config {
            graph,
            sharepoint,
            http,
            token_refresh_threshold: get("TOKEN_REFRESH_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Sites collection base URL, required by every Graph site operation
    pub fn graph_base_url(&self) -> Result<&str> {
        require(&self.graph.base_url, "GRAPH_BASE_URL")
    }

    /// Tenant-wide Graph root
    pub fn graph_api_root(&self) -> &str {
        self.graph
            .api_root
            .as_deref()
            .unwrap_or(DEFAULT_GRAPH_API_ROOT)
    }
}

/// Return a required setting or a configuration error naming its variable
pub(crate) fn require<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| ApiError::ConfigError(format!("{} is required", key)))
}

/// Parse SharePoint token endpoint version from string
fn parse_token_endpoint(s: &str) -> TokenEndpointVersion {
    match s.to_lowercase().as_str() {
        "v1" | "1" | "1.0" => TokenEndpointVersion::V1,
        _ => TokenEndpointVersion::V2,
    }
}
