use serde_json::{json, Value};

use crate::auth::ApiSurface;
use crate::client::{join_url, odata_literal, GrafapClient};
use crate::error::Result;
use crate::http_client::ApiRequest;
use crate::models::{Attachment, ListItemsQuery, GRAPH_PREFER_OPTIONAL};

impl GrafapClient {
    /// All lists in a site
    pub async fn lists(&self, site_id: &str) -> Result<Vec<Value>> {
        let url = self.graph_url(&format!("{}/lists", site_id))?;
        let request = ApiRequest::get(ApiSurface::Graph, url).context("get sharepoint lists");
        self.http().fetch_all(request).await
    }

    /// Items of a list with their field data expanded.
    ///
    /// Columns used in `query.filter` must be indexed in the list settings, or
    /// SharePoint rejects the query.
    pub async fn list_items(
        &self,
        site_id: &str,
        list_id: &str,
        query: &ListItemsQuery,
    ) -> Result<Vec<Value>> {
        let url = self.graph_url(&format!("{}/lists/{}/items", site_id, list_id))?;

        let expand = match &query.select {
            Some(select) => format!("fields($select={})", select),
            None => "fields".to_string(),
        };

        let mut request = ApiRequest::get(ApiSurface::Graph, url)
            .query("$expand", expand)
            .header("Prefer", GRAPH_PREFER_OPTIONAL)
            .context("get sharepoint list items");

        if let Some(filter) = &query.filter {
            request = request.query("$filter", filter.as_str());
        }

        self.http().fetch_all(request).await
    }

    /// A single list item
    pub async fn list_item(&self, site_id: &str, list_id: &str, item_id: &str) -> Result<Value> {
        let url = self.graph_url(&format!("{}/lists/{}/items/{}", site_id, list_id, item_id))?;
        let request = ApiRequest::get(ApiSurface::Graph, url)
            .header("Prefer", GRAPH_PREFER_OPTIONAL)
            .context("get sharepoint list item");
        self.http().execute_json(&request).await
    }

    /// Create an item from field data; returns the created item
    pub async fn create_list_item(&self, site_id: &str, list_id: &str, fields: Value) -> Result<Value> {
        let url = self.graph_url(&format!("{}/lists/{}/items", site_id, list_id))?;
        let request = ApiRequest::post(ApiSurface::Graph, url)
            .json(json!({ "fields": fields }))
            .context("create sharepoint list item");
        self.http().execute_json(&request).await
    }

    /// Patch only the given fields of an item
    pub async fn update_list_item(
        &self,
        site_id: &str,
        list_id: &str,
        item_id: &str,
        fields: Value,
    ) -> Result<()> {
        let url = self.graph_url(&format!(
            "{}/lists/{}/items/{}/fields",
            site_id, list_id, item_id
        ))?;
        let request = ApiRequest::patch(ApiSurface::Graph, url)
            .json(fields)
            .context("update sharepoint list item");
        self.http().execute(&request).await?;
        Ok(())
    }

    pub async fn delete_list_item(&self, site_id: &str, list_id: &str, item_id: &str) -> Result<()> {
        let url = self.graph_url(&format!("{}/lists/{}/items/{}", site_id, list_id, item_id))?;
        let request =
            ApiRequest::delete(ApiSurface::Graph, url).context("delete sharepoint list item");
        self.http().execute(&request).await?;
        Ok(())
    }

    /// Attachments of a list item, via SharePoint REST.
    ///
    /// With `download` unset only names and server-relative URLs are returned;
    /// otherwise each file is fetched and its bytes included.
    pub async fn list_item_attachments(
        &self,
        site_url: &str,
        list_name: &str,
        item_id: u64,
        download: bool,
    ) -> Result<Vec<Attachment>> {
        let url = join_url(
            site_url,
            &format!(
                "_api/lists/getByTitle({})/items({})",
                odata_literal(list_name),
                item_id
            ),
        );
        let request = ApiRequest::get(ApiSurface::SharePoint, url)
            .query("$select", "AttachmentFiles,Title")
            .query("$expand", "AttachmentFiles")
            .context("get list attachments");

        let body: Value = self.http().execute_json(&request).await?;
        let files = body
            .pointer("/d/AttachmentFiles/results")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut attachments = Vec::with_capacity(files.len());
        for file in files {
            let name = file
                .get("FileName")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let relative_url = file
                .get("ServerRelativeUrl")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let data = if download {
                let file_url = join_url(
                    site_url,
                    &format!(
                        "_api/Web/GetFileByServerRelativeUrl({})/$value",
                        odata_literal(&relative_url)
                    ),
                );
                let request = ApiRequest::get(ApiSurface::SharePoint, file_url)
                    .timeout(self.http().file_timeout())
                    .context("download list attachment");
                Some(self.http().execute_bytes(&request).await?.to_vec())
            } else {
                None
            };

            attachments.push(Attachment {
                name,
                url: relative_url,
                data,
            });
        }

        Ok(attachments)
    }
}
