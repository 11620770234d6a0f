// grafap - async client for Microsoft Graph and SharePoint REST

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod logging;
pub mod models;
pub mod pagination;

pub use auth::{ApiSurface, AuthManager};
pub use client::GrafapClient;
pub use config::Config;
pub use error::{ApiError, Result};
pub use http_client::{ApiRequest, GraphHttpClient};
pub use models::{
    Attachment, DownloadedFile, FolderInfo, ListItemsQuery, SiteUserLookup, UploadedFile,
    UserQuery,
};
pub use pagination::{Page, Paginator};
