// Authentication module
// Manages bearer token lifecycle for the Graph and SharePoint surfaces

mod credentials;
mod manager;
mod refresh;
mod types;

pub use credentials::grant_for;
pub use manager::AuthManager;
pub use types::{ApiSurface, ClientCredentialsGrant, Credential, GrantTarget};
