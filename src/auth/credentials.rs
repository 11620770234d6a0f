// Client-credentials grant resolution from configuration

use reqwest::Url;

use super::types::{ApiSurface, ClientCredentialsGrant, GrantTarget};
use crate::config::{require, Config, TokenEndpointVersion, DEFAULT_GRANT_TYPE};
use crate::error::{ApiError, Result};

/// Resolve the token request for a surface, failing on missing settings
pub fn grant_for(config: &Config, surface: ApiSurface) -> Result<ClientCredentialsGrant> {
    match surface {
        ApiSurface::Graph => graph_grant(config),
        ApiSurface::SharePoint => sharepoint_grant(config),
    }
}

fn graph_grant(config: &Config) -> Result<ClientCredentialsGrant> {
    let graph = &config.graph;
    let login = require(&graph.login_base_url, "GRAPH_LOGIN_BASE_URL")?;
    let tenant = require(&graph.tenant_id, "GRAPH_TENANT_ID")?;
    let client_id = require(&graph.client_id, "GRAPH_CLIENT_ID")?;
    let client_secret = require(&graph.client_secret, "GRAPH_CLIENT_SECRET")?;
    let scopes = require(&graph.scopes, "GRAPH_SCOPES")?;

    Ok(ClientCredentialsGrant {
        surface: ApiSurface::Graph,
        token_url: token_url(login, tenant, &TokenEndpointVersion::V2),
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
        grant_type: graph
            .grant_type
            .clone()
            .unwrap_or_else(|| DEFAULT_GRANT_TYPE.to_string()),
        target: GrantTarget::Scope(scopes.to_string()),
    })
}

fn sharepoint_grant(config: &Config) -> Result<ClientCredentialsGrant> {
    let sp = &config.sharepoint;
    let login = require(&sp.login_base_url, "SP_LOGIN_BASE_URL")?;
    let tenant = require(&sp.tenant_id, "SP_TENANT_ID")?;
    let client_id = require(&sp.client_id, "SP_CLIENT_ID")?;
    let client_secret = require(&sp.client_secret, "SP_CLIENT_SECRET")?;
    let site = require(&sp.site, "SP_SITE")?;

    let target = match sp.token_endpoint {
        TokenEndpointVersion::V1 => GrantTarget::Resource(site.to_string()),
        TokenEndpointVersion::V2 => match &sp.scopes {
            Some(scopes) => GrantTarget::Scope(scopes.clone()),
            None => GrantTarget::Scope(default_sharepoint_scope(site)?),
        },
    };

    Ok(ClientCredentialsGrant {
        surface: ApiSurface::SharePoint,
        token_url: token_url(login, tenant, &sp.token_endpoint),
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
        grant_type: sp
            .grant_type
            .clone()
            .unwrap_or_else(|| DEFAULT_GRANT_TYPE.to_string()),
        target,
    })
}

/// `https://contoso.sharepoint.com/sites/x` -> `https://contoso.sharepoint.com/.default`
fn default_sharepoint_scope(site: &str) -> Result<String> {
    let url = Url::parse(site)
        .map_err(|e| ApiError::ConfigError(format!("SP_SITE is not a valid URL: {}", e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| ApiError::ConfigError("SP_SITE has no host".to_string()))?;
    Ok(format!("{}://{}/.default", url.scheme(), host))
}

/// Token endpoint for a tenant under the login base URL
fn token_url(login_base_url: &str, tenant: &str, version: &TokenEndpointVersion) -> String {
    let path = match version {
        TokenEndpointVersion::V2 => "oauth2/v2.0/token",
        TokenEndpointVersion::V1 => "oauth2/token",
    };
    format!(
        "{}/{}/{}",
        login_base_url.trim_end_matches('/'),
        tenant.trim_matches('/'),
        path
    )
}
