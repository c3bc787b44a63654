//! Environment configuration for the server process.

use patchbay_db::DbConfig;
use patchbay_resolver::{CnamCredentials, ResolverConfig};

const DEFAULT_PORT: u16 = 8085;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PORT` — listen port.
    pub port: u16,
    /// `STORE_URI` — SurrealDB endpoint (`host:port`, a `ws://`
    /// prefix is accepted and stripped).
    pub store_uri: String,
    /// `STORE_NAMESPACE` / `STORE_DATABASE` / `STORE_USERNAME` /
    /// `STORE_PASSWORD`.
    pub store_namespace: String,
    pub store_database: String,
    pub store_username: String,
    pub store_password: String,
    /// `CNAM_PROJECT_ID` / `CNAM_API_TOKEN` / `CNAM_SPACE_HOST`.
    /// Enrichment is disabled unless all three are present.
    pub cnam_project_id: Option<String>,
    pub cnam_api_token: Option<String>,
    pub cnam_space_host: Option<String>,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = DbConfig::default();
        Self {
            port: env_var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            store_uri: env_var("STORE_URI").unwrap_or(defaults.url),
            store_namespace: env_var("STORE_NAMESPACE").unwrap_or(defaults.namespace),
            store_database: env_var("STORE_DATABASE").unwrap_or(defaults.database),
            store_username: env_var("STORE_USERNAME").unwrap_or(defaults.username),
            store_password: env_var("STORE_PASSWORD").unwrap_or(defaults.password),
            cnam_project_id: env_var("CNAM_PROJECT_ID"),
            cnam_api_token: env_var("CNAM_API_TOKEN"),
            cnam_space_host: env_var("CNAM_SPACE_HOST"),
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self
                .store_uri
                .trim_start_matches("ws://")
                .trim_start_matches("wss://")
                .to_string(),
            namespace: self.store_namespace.clone(),
            database: self.store_database.clone(),
            username: self.store_username.clone(),
            password: self.store_password.clone(),
        }
    }

    /// All three credentials or nothing: a partial set disables
    /// enrichment without failing startup.
    pub fn cnam_credentials(&self) -> Option<CnamCredentials> {
        match (
            &self.cnam_project_id,
            &self.cnam_api_token,
            &self.cnam_space_host,
        ) {
            (Some(project_id), Some(api_token), Some(space_host)) => Some(CnamCredentials {
                project_id: project_id.clone(),
                api_token: api_token.clone(),
                space_host: space_host.clone(),
            }),
            _ => None,
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ServerConfig {
        ServerConfig {
            port: DEFAULT_PORT,
            store_uri: "ws://127.0.0.1:8000".into(),
            store_namespace: "patchbay".into(),
            store_database: "main".into(),
            store_username: "root".into(),
            store_password: "root".into(),
            cnam_project_id: None,
            cnam_api_token: None,
            cnam_space_host: None,
        }
    }

    #[test]
    fn ws_scheme_is_stripped_for_the_db_client() {
        assert_eq!(base().db_config().url, "127.0.0.1:8000");
    }

    #[test]
    fn partial_cnam_credentials_disable_enrichment() {
        let mut config = base();
        assert!(config.cnam_credentials().is_none());

        config.cnam_project_id = Some("proj".into());
        config.cnam_api_token = Some("token".into());
        assert!(config.cnam_credentials().is_none());

        config.cnam_space_host = Some("example.signalwire.com".into());
        let creds = config.cnam_credentials().unwrap();
        assert_eq!(creds.project_id, "proj");
    }
}
