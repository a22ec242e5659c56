use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Base URL of plex.tv (overridable for testing against a stub).
    pub plex_tv_url: String,
    /// Sent as `X-Plex-Client-Identifier`; plex.tv ties pairings to it.
    pub plex_client_identifier: String,
    /// Concurrent metadata requests when listing a library section.
    pub metadata_workers: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let server_port = match env::var("SERVER_PORT") {
            Ok(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a port number, got '{}'", port))?,
            Err(_) => 8000,
        };

        let metadata_workers = match env::var("METADATA_WORKERS") {
            Ok(workers) => workers
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    anyhow::anyhow!("METADATA_WORKERS must be a positive number, got '{}'", workers)
                })?,
            Err(_) => 100,
        };

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port,
            plex_tv_url: env::var("PLEX_TV_URL")
                .unwrap_or_else(|_| "https://plex.tv".to_string())
                .trim_end_matches('/')
                .to_string(),
            plex_client_identifier: env::var("PLEX_CLIENT_IDENTIFIER")
                .unwrap_or_else(|_| "wheelplex".to_string()),
            metadata_workers,
        })
    }
}

/// Settings for the terminal wheel client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Value of the server's `session` cookie to present.
    pub session: Option<String>,
    /// Directory holding the cached library.
    pub state_dir: String,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        ClientConfig {
            base_url: env::var("WHEELPLEX_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            session: env::var("WHEELPLEX_SESSION").ok().filter(|s| !s.is_empty()),
            state_dir: env::var("WHEELPLEX_STATE_DIR").unwrap_or_else(|_| ".wheelplex".to_string()),
        }
    }
}
