// Cursor-following pagination over Graph and SharePoint list responses

use serde_json::Value;

use crate::error::Result;
use crate::http_client::{ApiRequest, GraphHttpClient};

pub const ODATA_VALUE: &str = "value";
pub const ODATA_NEXT_LINK: &str = "@odata.nextLink";

/// One page of records plus the continuation cursor, if any
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    pub next_link: Option<String>,
}

impl Page {
    /// Parse a page from either the Graph shape (`value` / `@odata.nextLink`)
    /// or the SharePoint verbose shape (`d.results` / `d.__next`).
    pub fn from_json(body: Value) -> Self {
        let (container, records_key, next_key) = match body.get("d") {
            Some(d) if d.get("results").is_some() => (d.clone(), "results", "__next"),
            _ => (body, ODATA_VALUE, ODATA_NEXT_LINK),
        };

        let records = container
            .get(records_key)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let next_link = container
            .get(next_key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Self { records, next_link }
    }
}

/// Walks a paged collection one request at a time
pub struct Paginator<'a> {
    http: &'a GraphHttpClient,
    next: Option<ApiRequest>,
    pages_fetched: usize,
}

impl<'a> Paginator<'a> {
    pub fn new(http: &'a GraphHttpClient, request: ApiRequest) -> Self {
        Self {
            http,
            next: Some(request),
            pages_fetched: 0,
        }
    }

    /// Fetch the next page, or `None` once the cursor chain has ended
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        let Some(request) = self.next.take() else {
            return Ok(None);
        };

        let body: Value = self.http.execute_json(&request).await?;
        let page = Page::from_json(body);
        self.pages_fetched += 1;

        tracing::debug!(
            page = self.pages_fetched,
            records = page.records.len(),
            has_next = page.next_link.is_some(),
            "Fetched page: {}",
            request.context
        );

        self.next = page.next_link.as_ref().map(|link| request.follow(link.clone()));
        Ok(Some(page))
    }

    /// Number of pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Drain every page; an error on any page discards what was already fetched
    pub async fn collect_all(mut self) -> Result<Vec<Value>> {
        let mut all_results = Vec::new();
        while let Some(page) = self.next_page().await? {
            all_results.extend(page.records);
        }
        Ok(all_results)
    }
}
