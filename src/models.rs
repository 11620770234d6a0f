// Reshaped results returned by the endpoint wrappers.
// Everything else is passed through as opaque JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const USER_INFO_LIST_NAME: &str = "User Information List";
pub const GRAPH_PREFER_OPTIONAL: &str = "HonorNonIndexedQueriesWarningMayFailRandomly";

/// Attachment on a SharePoint list item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
    /// File content, present only when downloading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

/// File fetched from a document library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadedFile {
    pub name: String,
    pub url: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FolderInfo {
    pub server_relative_url: String,
    pub name: String,
    pub full_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UploadedFile {
    pub name: String,
    pub server_relative_url: String,
    pub time_created: Option<String>,
    pub time_last_modified: Option<String>,
    /// SharePoint reports the length as a string
    pub length: Option<String>,
}

/// Options for `list_items`
#[derive(Debug, Clone, Default)]
pub struct ListItemsQuery {
    /// OData `$filter`; filtered columns must be indexed
    pub filter: Option<String>,
    /// Field names for `fields($select=...)`
    pub select: Option<String>,
}

/// OData options for `ad_users`
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub select: Option<String>,
    pub filter: Option<String>,
    pub expand: Option<String>,
}

/// How to look up a user in the hidden user information list
#[derive(Debug, Clone, PartialEq)]
pub enum SiteUserLookup {
    Id(String),
    Email(String),
}

/// Render a JSON scalar as a string, treating null as absent
pub(crate) fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
