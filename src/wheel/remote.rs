use super::app::SessionValidator;
use super::cache::LibrarySource;
use crate::error::ClientError;
use crate::models::Item;
use async_trait::async_trait;
use reqwest::{header, Client, Response};

/// The wheelplex server's `/list` and `/session` endpoints.
#[derive(Debug, Clone)]
pub struct RemoteLibrary {
    base_url: String,
    session: Option<String>,
    client: Client,
}

impl RemoteLibrary {
    pub fn new(base_url: impl Into<String>, session: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if let Some(session) = &self.session {
            request = request.header(header::COOKIE, format!("session={}", session));
        }

        tracing::debug!("GET {}", url);

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!("{} returned status {}", url, status);
            return Err(ClientError::Status(status.as_u16()));
        }

        Ok(response)
    }
}

#[async_trait]
impl LibrarySource for RemoteLibrary {
    async fn fetch_library(&self) -> Result<Vec<Item>, ClientError> {
        let response = self.get("/list").await?;
        let items: Vec<Item> = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        tracing::debug!("Fetched {} items from library service", items.len());
        Ok(items)
    }
}

#[async_trait]
impl SessionValidator for RemoteLibrary {
    async fn validate_session(&self) -> Result<(), ClientError> {
        self.get("/session").await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let remote = RemoteLibrary::new("http://localhost:8000/", None);
        assert_eq!(remote.base_url(), "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is closed on any sane test machine.
        let remote = RemoteLibrary::new("http://127.0.0.1:9", Some("abc".to_string()));
        let err = remote.fetch_library().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
