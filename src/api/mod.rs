// Endpoint wrappers
// Each submodule adds methods to `GrafapClient` for one resource family

mod doc_libraries;
mod lists;
mod sites;
mod termstore;
mod users;

pub use doc_libraries::{path_prefixes, server_relative_path, split_file_url};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use std::time::Duration;

    use crate::auth::{ApiSurface, Credential};
    use crate::client::GrafapClient;
    use crate::config::{Config, GraphSettings, HttpSettings};

    /// Client pointed at a mock server with both surfaces holding valid tokens
    pub(crate) async fn client_for(server: &mockito::ServerGuard) -> GrafapClient {
        let config = Config {
            graph: GraphSettings {
                base_url: Some(format!("{}/v1.0/sites/", server.url())),
                api_root: Some(format!("{}/v1.0", server.url())),
                ..Default::default()
            },
            http: HttpSettings {
                max_attempts: 1,
                retry_initial_delay: Duration::from_millis(1),
                ..Default::default()
            },
            ..Default::default()
        };

        let client = GrafapClient::new(config).unwrap();
        for (surface, token) in [
            (ApiSurface::Graph, "graph-token"),
            (ApiSurface::SharePoint, "sp-token"),
        ] {
            client
                .auth_manager()
                .seed(Credential {
                    surface,
                    bearer_token: token.to_string(),
                    expires_at: Utc::now() + chrono::Duration::hours(1),
                })
                .await;
        }
        client
    }
}
