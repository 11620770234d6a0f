use bytes::Bytes;
use reqwest::Url;
use serde_json::{json, Value};

use crate::auth::ApiSurface;
use crate::client::{join_url, odata_literal, GrafapClient};
use crate::error::{ApiError, Result};
use crate::http_client::{is_already_exists, ApiRequest};
use crate::models::{scalar_string, DownloadedFile, FolderInfo, UploadedFile};

impl GrafapClient {
    /// Document libraries (drives) of a site
    pub async fn doc_libraries(&self, site_id: &str) -> Result<Vec<Value>> {
        let url = self.graph_url(&format!("{}/drives", site_id))?;
        let request = ApiRequest::get(ApiSurface::Graph, url).context("get document libraries");
        self.http().fetch_all(request).await
    }

    /// Files and folders at the root of a library, or inside `subfolder_id`
    pub async fn doc_library_items(
        &self,
        site_id: &str,
        drive_id: &str,
        subfolder_id: Option<&str>,
    ) -> Result<Vec<Value>> {
        let path = match subfolder_id {
            Some(sub) if !sub.is_empty() => {
                format!("{}/drives/{}/items/{}/children", site_id, drive_id, sub)
            }
            _ => format!("{}/drives/{}/root/children", site_id, drive_id),
        };
        let url = self.graph_url(&path)?;
        let request =
            ApiRequest::get(ApiSurface::Graph, url).context("get document library items");
        self.http().fetch_all(request).await
    }

    /// Download a file by its absolute SharePoint URL
    pub async fn download_file(&self, file_url: &str) -> Result<DownloadedFile> {
        let (site_url, name) = split_file_url(file_url)?;
        let request = ApiRequest::get(
            ApiSurface::SharePoint,
            with_url_alias(
                &join_url(&site_url, "_api/Web/GetFileByUrl(@url)/$value"),
                file_url,
            ),
        )
        .timeout(self.http().file_timeout())
        .context("download file");

        let data = self.http().execute_bytes(&request).await?;
        tracing::debug!(file = %name, size = data.len(), "Downloaded file");

        Ok(DownloadedFile {
            name,
            url: file_url.to_string(),
            data: data.to_vec(),
        })
    }

    /// Create a folder and any missing parents.
    ///
    /// `folder_path` may be relative to the site or server-relative, with either
    /// slash style. Folders that already exist are left alone.
    pub async fn create_folder(&self, site_url: &str, folder_path: &str) -> Result<FolderInfo> {
        let path = server_relative_path(site_url, folder_path)?;
        let endpoint = join_url(site_url, "_api/web/folders");

        for prefix in path_prefixes(&path) {
            let request = ApiRequest::post(ApiSurface::SharePoint, endpoint.as_str())
                .json(json!({
                    "__metadata": { "type": "SP.Folder" },
                    "ServerRelativeUrl": prefix,
                }))
                .context("create folder");

            let response = self.http().send(&request).await?;
            let status = response.status();
            if status.is_success() {
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            if is_already_exists(status, &body) {
                tracing::debug!(folder = %prefix, "Folder already exists");
                continue;
            }

            tracing::error!(
                status = status.as_u16(),
                folder = %prefix,
                response_body = %body,
                "Could not create folder"
            );
            return Err(ApiError::ServiceError {
                status: status.as_u16(),
                message: body,
            });
        }

        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        Ok(FolderInfo {
            server_relative_url: path.clone(),
            name,
            full_path: path,
        })
    }

    /// Upload bytes into a folder of the site
    pub async fn upload_file(
        &self,
        site_url: &str,
        folder_path: &str,
        file_name: &str,
        content: impl Into<Bytes>,
        overwrite: bool,
    ) -> Result<UploadedFile> {
        let path = server_relative_path(site_url, folder_path)?;
        let url = join_url(
            site_url,
            &format!(
                "_api/web/GetFolderByServerRelativeUrl({})/Files/add(url={},overwrite={})",
                odata_literal(&path),
                odata_literal(file_name),
                overwrite
            ),
        );
        let request = ApiRequest::post(ApiSurface::SharePoint, url)
            .header("Content-Type", "application/octet-stream")
            .bytes(content)
            .timeout(self.http().file_timeout())
            .context("upload file");

        let body: Value = self.http().execute_json(&request).await?;
        let d = body.get("d").cloned().unwrap_or(Value::Null);

        Ok(UploadedFile {
            name: scalar_string(d.get("Name")).unwrap_or_else(|| file_name.to_string()),
            server_relative_url: scalar_string(d.get("ServerRelativeUrl")).unwrap_or_else(|| {
                format!("{}/{}", path.trim_end_matches('/'), file_name)
            }),
            time_created: scalar_string(d.get("TimeCreated")),
            time_last_modified: scalar_string(d.get("TimeLastModified")),
            length: scalar_string(d.get("Length")),
        })
    }

    /// Delete a file by its absolute SharePoint URL
    pub async fn delete_file(&self, file_url: &str) -> Result<()> {
        let (site_url, _) = split_file_url(file_url)?;
        let request = ApiRequest::delete(
            ApiSurface::SharePoint,
            with_url_alias(&join_url(&site_url, "_api/Web/GetFileByUrl(@url)"), file_url),
        )
        .context("delete file");

        self.http().execute(&request).await?;
        Ok(())
    }
}

/// Append the `@url` parameter alias to an endpoint.
///
/// The alias name must reach SharePoint as a literal `@`, so it is written into the
/// URL instead of going through form encoding. Characters that would end or split
/// the query are escaped; existing percent escapes and the rest are left to URL parsing.
fn with_url_alias(endpoint: &str, file_url: &str) -> String {
    let literal = odata_literal(file_url)
        .replace('#', "%23")
        .replace('&', "%26")
        .replace('+', "%2B");
    format!("{}?@url={}", endpoint, literal)
}

/// Split an absolute file URL into the site URL and the file name.
///
/// The site is the origin plus the first two path segments, so
/// `https://t.sharepoint.com/sites/Team/Docs/a.txt` gives
/// `("https://t.sharepoint.com/sites/Team", "a.txt")`.
pub fn split_file_url(file_url: &str) -> Result<(String, String)> {
    let parsed = Url::parse(file_url)
        .map_err(|e| ApiError::ValidationError(format!("Invalid file URL {}: {}", file_url, e)))?;
    if parsed.host_str().is_none() {
        return Err(ApiError::ValidationError(format!(
            "File URL has no host: {}",
            file_url
        )));
    }

    // Work on the raw path so names keep the caller's spelling
    let after_scheme = file_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(file_url);
    let raw_path = after_scheme
        .find('/')
        .map(|i| &after_scheme[i..])
        .unwrap_or("");
    let raw_path = raw_path.split(['?', '#']).next().unwrap_or_default();

    let parts: Vec<&str> = raw_path.split('/').collect();
    let file_name = parts.last().copied().unwrap_or_default();
    if parts.len() < 4 || file_name.is_empty() {
        return Err(ApiError::ValidationError(format!(
            "File URL must contain a site path and a file name: {}",
            file_url
        )));
    }

    let site_url = format!("{}{}", parsed.origin().ascii_serialization(), parts[..3].join("/"));
    Ok((site_url, file_name.to_string()))
}

/// Normalise a folder path to a server-relative path.
///
/// Backslashes become `/`, relative paths are placed under the site's own path,
/// and empty or `.` segments are dropped. The result always starts with `/`.
pub fn server_relative_path(site_url: &str, folder_path: &str) -> Result<String> {
    let site = Url::parse(site_url)
        .map_err(|e| ApiError::ValidationError(format!("Invalid site URL {}: {}", site_url, e)))?;

    let folder = folder_path.replace('\\', "/");
    let combined = if folder.starts_with('/') {
        folder
    } else {
        format!("{}/{}", site.path(), folder)
    };

    let segments: Vec<&str> = combined
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    Ok(format!("/{}", segments.join("/")))
}

/// Every ancestor of a server-relative path, shortest first, ending with the path itself
pub fn path_prefixes(path: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut current = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        prefixes.push(current.clone());
    }
    prefixes
}
