use serde_json::Value;

use crate::auth::ApiSurface;
use crate::client::GrafapClient;
use crate::error::Result;
use crate::http_client::ApiRequest;

impl GrafapClient {
    /// Every site in the tenant. Needed to find the site id used by the
    /// list and document library operations.
    pub async fn sites(&self) -> Result<Vec<Value>> {
        let url = self.config().graph_base_url()?;
        let request = ApiRequest::get(ApiSurface::Graph, url).context("get sites");
        self.http().fetch_all(request).await
    }
}
