use chrono::{Duration, Utc};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::credentials;
use super::refresh;
use super::types::{ApiSurface, Credential};
use crate::config::Config;
use crate::error::{ApiError, Result};

/// Authentication manager
/// Holds one cached credential per API surface and refreshes it lazily
pub struct AuthManager {
    config: Arc<Config>,

    /// HTTP client for token requests
    client: Client,

    /// Cached Graph credential
    graph: Mutex<Option<Credential>>,

    /// Cached SharePoint REST credential
    sharepoint: Mutex<Option<Credential>>,

    /// How long before expiry a token counts as stale
    refresh_threshold: Duration,
}

impl AuthManager {
    /// Create a new AuthManager sharing the given HTTP client
    pub fn new(config: Arc<Config>, client: Client) -> Self {
        let refresh_threshold = threshold_from_secs(config.token_refresh_threshold);
        Self {
            config,
            client,
            graph: Mutex::new(None),
            sharepoint: Mutex::new(None),
            refresh_threshold,
        }
    }

    fn slot(&self, surface: ApiSurface) -> &Mutex<Option<Credential>> {
        match surface {
            ApiSurface::Graph => &self.graph,
            ApiSurface::SharePoint => &self.sharepoint,
        }
    }

    /// Get a valid bearer token for the surface, requesting a new one if needed.
    /// The slot lock is held across the token request, so concurrent callers
    /// wait for a single refresh instead of issuing their own.
    pub async fn ensure_valid_token(&self, surface: ApiSurface) -> Result<String> {
        let mut slot = self.slot(surface).lock().await;

        if let Some(cred) = slot.as_ref() {
            if !cred.is_expired_at(Utc::now(), self.refresh_threshold) {
                return Ok(cred.bearer_token.clone());
            }
            tracing::debug!(surface = %surface, "Cached token expired");
        }

        let grant = credentials::grant_for(&self.config, surface)?;
        let token_data = refresh::request_token(&self.client, &grant).await?;

        let expires_at = Duration::try_seconds(token_data.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                ApiError::AuthError(format!(
                    "Token response has an unusable expires_in: {}",
                    token_data.expires_in
                ))
            })?;
        tracing::info!(
            surface = %surface,
            "Token acquired, expires: {}",
            expires_at.to_rfc3339()
        );

        let token = token_data.access_token.clone();
        *slot = Some(Credential {
            surface,
            bearer_token: token_data.access_token,
            expires_at,
        });

        Ok(token)
    }

    /// Snapshot of the cached credential, if any
    pub async fn current_credential(&self, surface: ApiSurface) -> Option<Credential> {
        self.slot(surface).lock().await.clone()
    }

    /// Drop the cached credential so the next call requests a new token
    pub async fn invalidate(&self, surface: ApiSurface) {
        tracing::debug!(surface = %surface, "Invalidating cached token");
        *self.slot(surface).lock().await = None;
    }

    #[cfg(test)]
    pub(crate) async fn seed(&self, credential: Credential) {
        let surface = credential.surface;
        *self.slot(surface).lock().await = Some(credential);
    }
}

/// Thresholds too large to represent are clamped, which keeps every token stale
fn threshold_from_secs(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}
