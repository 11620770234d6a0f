// Authentication types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Which API a token is issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiSurface {
    /// Microsoft Graph (`https://graph.microsoft.com/...`)
    Graph,
    /// Per-site SharePoint REST (`{site}/_api/...`)
    SharePoint,
}

impl fmt::Display for ApiSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiSurface::Graph => write!(f, "graph"),
            ApiSurface::SharePoint => write!(f, "sharepoint"),
        }
    }
}

/// Cached bearer token for one surface
#[derive(Debug, Clone)]
pub struct Credential {
    pub surface: ApiSurface,
    pub bearer_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// True once `now + threshold` has reached the expiry instant.
    /// A sum past the representable range counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        now.checked_add_signed(threshold)
            .map_or(true, |deadline| deadline >= self.expires_at)
    }
}

/// What the token request asks for
#[derive(Debug, Clone, PartialEq)]
pub enum GrantTarget {
    /// v2 endpoint, space-separated scopes
    Scope(String),
    /// v1 endpoint, resource URI
    Resource(String),
}

/// Everything needed to issue one client-credentials token request
#[derive(Debug, Clone)]
pub struct ClientCredentialsGrant {
    pub surface: ApiSurface,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: String,
    pub target: GrantTarget,
}

/// Token data from a successful token response
#[derive(Debug, Clone)]
pub struct TokenData {
    pub access_token: String,
    pub expires_in: i64,
}

/// OAuth2 token endpoint response
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(deserialize_with = "deserialize_expires_in")]
    pub expires_in: i64,
}

// The v1 endpoint reports `expires_in` as a string, v2 as a number.
fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
