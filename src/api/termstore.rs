use serde_json::Value;

use crate::auth::ApiSurface;
use crate::client::GrafapClient;
use crate::error::Result;
use crate::http_client::ApiRequest;

impl GrafapClient {
    /// Term store groups of a site, as returned by Graph
    pub async fn termstore_groups(&self, site_id: &str) -> Result<Value> {
        let url = self.graph_url(&format!("{}/termStore/groups", site_id))?;
        let request = ApiRequest::get(ApiSurface::Graph, url).context("get termstore groups");
        self.http().execute_json(&request).await
    }
}
