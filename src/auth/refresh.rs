// Token request logic

use reqwest::Client;

use super::types::{ClientCredentialsGrant, GrantTarget, TokenData, TokenResponse};
use crate::error::{ApiError, Result};

/// Issue one client-credentials token request. Never retried.
pub async fn request_token(client: &Client, grant: &ClientCredentialsGrant) -> Result<TokenData> {
    tracing::info!(surface = %grant.surface, "Requesting access token...");

    let (target_key, target_value) = match &grant.target {
        GrantTarget::Scope(scope) => ("scope", scope.as_str()),
        GrantTarget::Resource(resource) => ("resource", resource.as_str()),
    };

    let form = [
        ("client_id", grant.client_id.as_str()),
        ("client_secret", grant.client_secret.as_str()),
        ("grant_type", grant.grant_type.as_str()),
        (target_key, target_value),
    ];

    tracing::debug!(
        "Token request: url={}, client_id={}..., {}={}",
        grant.token_url,
        client_id_prefix(&grant.client_id),
        target_key,
        target_value
    );

    let response = client
        .post(&grant.token_url)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| ApiError::Network {
            attempts: 1,
            message: format!("Failed to send token request: {}", e),
        })?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        tracing::error!(
            surface = %grant.surface,
            status = status.as_u16(),
            body = %body,
            "Token request failed"
        );

        // Azure AD errors carry error / error_description
        if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(&body) {
            if let (Some(code), Some(desc)) = (
                error_json.get("error").and_then(|v| v.as_str()),
                error_json.get("error_description").and_then(|v| v.as_str()),
            ) {
                return Err(ApiError::AuthError(format!(
                    "Token request failed: {} - {}: {}",
                    status, code, desc
                )));
            }
        }

        return Err(ApiError::AuthError(format!(
            "Token request failed: {} - {}",
            status, body
        )));
    }

    let data: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        ApiError::AuthError(format!("Failed to parse token response: {} ({})", e, body))
    })?;

    if data.access_token.is_empty() {
        return Err(ApiError::AuthError(
            "Token response does not contain access_token".to_string(),
        ));
    }

    Ok(TokenData {
        access_token: data.access_token,
        expires_in: data.expires_in,
    })
}

/// First eight characters of a client id, for logs
fn client_id_prefix(client_id: &str) -> String {
    client_id.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::ApiSurface;
    use mockito::Matcher;

    fn grant(url: String, target: GrantTarget) -> ClientCredentialsGrant {
        ClientCredentialsGrant {
            surface: ApiSurface::Graph,
            token_url: url,
            client_id: "client-id-123".to_string(),
            client_secret: "s3cret".to_string(),
            grant_type: "client_credentials".to_string(),
            target,
        }
    }

    #[test]
    fn test_client_id_prefix_respects_char_boundaries() {
        assert_eq!(client_id_prefix("client-id-123"), "client-i");
        assert_eq!(client_id_prefix("abc"), "abc");
        assert_eq!(client_id_prefix("ééééééééé"), "éééééééé");
        assert_eq!(client_id_prefix("1234567é9"), "1234567é");
    }

    #[tokio::test]
    async fn test_request_token_posts_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant/oauth2/v2.0/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "client-id-123".into()),
                Matcher::UrlEncoded("client_secret".into(), "s3cret".into()),
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("scope".into(), "https://graph.microsoft.com/.default".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"T","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let grant = grant(
            format!("{}/tenant/oauth2/v2.0/token", server.url()),
            GrantTarget::Scope("https://graph.microsoft.com/.default".to_string()),
        );
        let token = request_token(&Client::new(), &grant).await.unwrap();

        assert_eq!(token.access_token, "T");
        assert_eq!(token.expires_in, 3600);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_token_resource_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant/oauth2/token")
            .match_body(Matcher::UrlEncoded(
                "resource".into(),
                "https://contoso.sharepoint.com".into(),
            ))
            .with_status(200)
            .with_body(r#"{"access_token":"SP","expires_in":"3599"}"#)
            .create_async()
            .await;

        let grant = grant(
            format!("{}/tenant/oauth2/token", server.url()),
            GrantTarget::Resource("https://contoso.sharepoint.com".to_string()),
        );
        let token = request_token(&Client::new(), &grant).await.unwrap();

        assert_eq!(token.access_token, "SP");
        assert_eq!(token.expires_in, 3599);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_token_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/t/oauth2/v2.0/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret"}"#)
            .create_async()
            .await;

        let grant = grant(
            format!("{}/t/oauth2/v2.0/token", server.url()),
            GrantTarget::Scope("x".to_string()),
        );
        let err = request_token(&Client::new(), &grant).await.unwrap_err();

        match err {
            ApiError::AuthError(msg) => {
                assert!(msg.contains("invalid_client"));
                assert!(msg.contains("AADSTS7000215"));
            }
            other => panic!("expected AuthError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_token_unparseable_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/t/oauth2/v2.0/token")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let grant = grant(
            format!("{}/t/oauth2/v2.0/token", server.url()),
            GrantTarget::Scope("x".to_string()),
        );
        let err = request_token(&Client::new(), &grant).await.unwrap_err();
        assert!(matches!(err, ApiError::AuthError(ref m) if m.contains("Failed to parse")));
    }

    #[tokio::test]
    async fn test_request_token_empty_access_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/t/oauth2/v2.0/token")
            .with_status(200)
            .with_body(r#"{"access_token":"","expires_in":3600}"#)
            .create_async()
            .await;

        let grant = grant(
            format!("{}/t/oauth2/v2.0/token", server.url()),
            GrantTarget::Scope("x".to_string()),
        );
        let err = request_token(&Client::new(), &grant).await.unwrap_err();
        assert!(matches!(err, ApiError::AuthError(_)));
    }
}
