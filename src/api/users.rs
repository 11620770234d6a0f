use serde_json::{json, Value};

use crate::auth::ApiSurface;
use crate::client::{join_url, odata_literal, GrafapClient};
use crate::error::{ApiError, Result};
use crate::http_client::ApiRequest;
use crate::models::{SiteUserLookup, UserQuery, GRAPH_PREFER_OPTIONAL, USER_INFO_LIST_NAME};
use crate::pagination::ODATA_VALUE;

impl GrafapClient {
    /// Entra ID (Azure AD) users of the tenant
    pub async fn ad_users(&self, query: &UserQuery) -> Result<Vec<Value>> {
        let url = join_url(self.config().graph_api_root(), "users");
        let mut request = ApiRequest::get(ApiSurface::Graph, url).context("get users");

        for (key, value) in [
            ("$select", &query.select),
            ("$filter", &query.filter),
            ("$expand", &query.expand),
        ] {
            if let Some(value) = value {
                request = request.query(key, value.as_str());
            }
        }

        self.http().fetch_all(request).await
    }

    /// Entries of the site's hidden user information list
    pub async fn site_users(&self, site_id: &str) -> Result<Vec<Value>> {
        let url = self.user_info_items_url(site_id)?;
        let request = ApiRequest::get(ApiSurface::Graph, url)
            .query("expand", "fields(select=Id,Email)")
            .context("get site users");
        self.http().fetch_all(request).await
    }

    /// One entry of the user information list, by item id or by e-mail
    pub async fn site_user(&self, site_id: &str, lookup: SiteUserLookup) -> Result<Value> {
        let items_url = self.user_info_items_url(site_id)?;
        let request = match &lookup {
            SiteUserLookup::Id(id) => {
                ApiRequest::get(ApiSurface::Graph, join_url(&items_url, id))
            }
            SiteUserLookup::Email(email) => ApiRequest::get(ApiSurface::Graph, items_url)
                .query("$filter", format!("fields/UserName eq {}", odata_literal(email))),
        }
        .header("Prefer", GRAPH_PREFER_OPTIONAL)
        .context("get site user");

        let body: Value = self.http().execute_json(&request).await?;

        match body.get(ODATA_VALUE).and_then(|v| v.as_array()) {
            Some(matches) => matches.first().cloned().ok_or_else(|| {
                ApiError::NotFound(format!("No user in {} matches {:?}", USER_INFO_LIST_NAME, lookup))
            }),
            None => Ok(body),
        }
    }

    /// Make sure a login is known to the site, adding it if needed
    pub async fn ensure_user(&self, site_url: &str, logon_name: &str) -> Result<Value> {
        let request = ApiRequest::post(
            ApiSurface::SharePoint,
            join_url(site_url, "_api/web/ensureuser"),
        )
        .json(json!({ "logonName": logon_name }))
        .context("ensure user");
        self.http().execute_json(&request).await
    }

    fn user_info_items_url(&self, site_id: &str) -> Result<String> {
        self.graph_url(&format!(
            "{}/lists({})/items",
            site_id,
            odata_literal(USER_INFO_LIST_NAME)
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::client_for;
    use crate::error::ApiError;
    use crate::models::{SiteUserLookup, UserQuery};
    use mockito::Matcher;
    use serde_json::json;

    const USER_ITEMS: &str = "/v1.0/sites/s/lists('User%20Information%20List')/items";

    #[tokio::test]
    async fn test_ad_users_with_options() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1.0/users")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("$select".into(), "id,mail".into()),
                Matcher::UrlEncoded("$filter".into(), "accountEnabled eq true".into()),
            ]))
            .with_status(200)
            .with_body(json!({"value": [{"id": "u1"}, {"id": "u2"}]}).to_string())
            .create_async()
            .await;

        let client = client_for(&server).await;
        let query = UserQuery {
            select: Some("id,mail".to_string()),
            filter: Some("accountEnabled eq true".to_string()),
            expand: None,
        };
        let users = client.ad_users(&query).await.unwrap();

        assert_eq!(users.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_site_users() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", USER_ITEMS)
            .match_query(Matcher::UrlEncoded(
                "expand".into(),
                "fields(select=Id,Email)".into(),
            ))
            .with_status(200)
            .with_body(json!({"value": [{"fields": {"Id": "1", "Email": "a@b.c"}}]}).to_string())
            .create_async()
            .await;

        let client = client_for(&server).await;
        let users = client.site_users("s").await.unwrap();

        assert_eq!(users[0]["fields"]["Email"], "a@b.c");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_site_user_by_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", format!("{}/12", USER_ITEMS).as_str())
            .match_header("prefer", "HonorNonIndexedQueriesWarningMayFailRandomly")
            .with_status(200)
            .with_body(json!({"id": "12", "fields": {"Title": "Ann"}}).to_string())
            .create_async()
            .await;

        let client = client_for(&server).await;
        let user = client
            .site_user("s", SiteUserLookup::Id("12".to_string()))
            .await
            .unwrap();

        assert_eq!(user["id"], "12");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_site_user_by_email_returns_first_match() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", USER_ITEMS)
            .match_query(Matcher::UrlEncoded(
                "$filter".into(),
                "fields/UserName eq 'o''neil@contoso.com'".into(),
            ))
            .with_status(200)
            .with_body(json!({"value": [{"id": "3"}, {"id": "4"}]}).to_string())
            .create_async()
            .await;

        let client = client_for(&server).await;
        let user = client
            .site_user("s", SiteUserLookup::Email("o'neil@contoso.com".to_string()))
            .await
            .unwrap();

        assert_eq!(user["id"], "3");
    }

    #[tokio::test]
    async fn test_site_user_empty_result_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", USER_ITEMS)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"value": []}).to_string())
            .create_async()
            .await;

        let client = client_for(&server).await;
        let err = client
            .site_user("s", SiteUserLookup::Email("nobody@contoso.com".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ensure_user() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/sites/team/_api/web/ensureuser")
            .match_header("authorization", "Bearer sp-token")
            .match_body(Matcher::Json(json!({"logonName": "i:0#.f|membership|a@b.c"})))
            .with_status(200)
            .with_body(json!({"d": {"Id": 11, "Email": "a@b.c"}}).to_string())
            .create_async()
            .await;

        let client = client_for(&server).await;
        let site_url = format!("{}/sites/team", server.url());
        let user = client
            .ensure_user(&site_url, "i:0#.f|membership|a@b.c")
            .await
            .unwrap();

        assert_eq!(user["d"]["Id"], 11);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ensure_user_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/_api/web/ensureuser")
            .with_status(400)
            .with_body("The specified user could not be found.")
            .create_async()
            .await;

        let client = client_for(&server).await;
        let err = client.ensure_user(&server.url(), "ghost").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }
}
