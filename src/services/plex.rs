use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{AuthToken, Item, LibraryAccess, Pairing, SectionMeta, ServerMeta};
use chrono::DateTime;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};

const PLEX_IDENT_HEADERS: [(&str, &str); 7] = [
    ("X-Plex-Platform", "Linux"),
    ("X-Plex-Platform-Version", "0.0.1"),
    ("X-Plex-Provides", "controller"),
    ("X-Plex-Product", "Wheelplex Web"),
    ("X-Plex-Version", env!("CARGO_PKG_VERSION")),
    ("X-Plex-Device", "Linux"),
    ("X-Plex-Device-Name", "Wheelplex"),
];

/// Talks to plex.tv (pairing, server discovery) and to the user's media
/// server (library listing).
#[derive(Debug, Clone)]
pub struct PlexClient {
    plex_tv_url: String,
    client_identifier: String,
    metadata_workers: usize,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct PinEnvelope {
    pin: PinData,
}

#[derive(Debug, Deserialize)]
struct PinData {
    id: i64,
    code: String,
    #[serde(default)]
    auth_token: Option<String>,
}

/// plex.tv answers with a bare object when there is exactly one entry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(t) => vec![t],
        }
    }
}

#[derive(Debug, Deserialize)]
struct Resource {
    name: String,
    #[serde(default)]
    provides: String,
    #[serde(default)]
    connections: OneOrMany<Connection>,
}

#[derive(Debug, Deserialize)]
struct Connection {
    protocol: String,
    address: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct MediaContainer<T> {
    #[serde(rename = "MediaContainer")]
    media_container: T,
}

#[derive(Debug, Deserialize)]
struct DirectoryList {
    #[serde(rename = "Directory", default)]
    directory: Vec<Directory>,
}

#[derive(Debug, Deserialize)]
struct Directory {
    key: String,
    title: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct MetadataList {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<Metadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    rating_key: String,
    title: String,
    rating: Option<f64>,
    audience_rating: Option<f64>,
    summary: Option<String>,
    thumb: Option<String>,
    last_viewed_at: Option<i64>,
    #[serde(rename = "Genre", default)]
    genre: Vec<Tag>,
}

#[derive(Debug, Clone, Deserialize)]
struct Tag {
    tag: String,
}

impl From<Metadata> for Item {
    fn from(meta: Metadata) -> Self {
        Item {
            title: meta.title,
            viewed_at: meta
                .last_viewed_at
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            critic_rating: meta.rating,
            audience_rating: meta.audience_rating,
            summary: meta.summary.filter(|s| !s.is_empty()),
            genres: meta.genre.into_iter().map(|g| g.tag).collect(),
            thumbnail_url: meta.thumb.map(|thumb| format!("/plex_asset{}", thumb)),
        }
    }
}

impl Resource {
    fn into_server(self) -> Option<ServerMeta> {
        if !self.provides.split(',').any(|p| p.trim() == "server") {
            return None;
        }
        let name = self.name;
        self.connections
            .into_vec()
            .into_iter()
            .next()
            .map(|conn| ServerMeta {
                name,
                scheme: conn.protocol,
                host: conn.address,
                port: conn.port,
            })
    }
}

impl PlexClient {
    pub fn new(config: &Config) -> Self {
        Self {
            plex_tv_url: config.plex_tv_url.clone(),
            client_identifier: config.plex_client_identifier.clone(),
            metadata_workers: config.metadata_workers,
            client: Client::new(),
        }
    }

    fn request(&self, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json")
            .header("X-Plex-Client-Identifier", &self.client_identifier);

        for (name, value) in PLEX_IDENT_HEADERS {
            request = request.header(name, value);
        }
        if let Some(token) = token {
            request = request.header("X-Plex-Token", token);
        }

        request
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Plex(format!("Request failed: {}", e)))?;

        let url = response.url().path().to_string();
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Plex API error on {}: {} - {}", url, status, body);
            return Err(AppError::Plex(format!("{} returned status {}", url, status)));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| AppError::Plex(format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&response_text).map_err(|e| {
            AppError::Plex(format!(
                "Failed to parse response from {}: {} - Response: {}",
                url,
                e,
                response_text.chars().take(200).collect::<String>()
            ))
        })
    }

    /// Ask plex.tv for a PIN the user can claim at plex.tv/link.
    pub async fn start_pairing(&self) -> Result<Pairing> {
        let url = format!("{}/pins.json", self.plex_tv_url);
        let data: PinEnvelope = self.send(self.request(Method::POST, &url, None)).await?;

        tracing::info!("Started plex.tv pairing {}", data.pin.id);
        Ok(Pairing {
            id: data.pin.id,
            pin: data.pin.code,
        })
    }

    /// The auth token, once the user has claimed the PIN.
    pub async fn finish_pairing(&self, pairing: &Pairing) -> Result<Option<AuthToken>> {
        let url = format!("{}/pins/{}.json", self.plex_tv_url, pairing.id);
        let data: PinEnvelope = self.send(self.request(Method::GET, &url, None)).await?;
        Ok(data.pin.auth_token.filter(|t| !t.is_empty()))
    }

    pub async fn list_servers(&self, token: &str) -> Result<Vec<ServerMeta>> {
        let url = format!("{}/api/v2/resources?includeHttps=1", self.plex_tv_url);
        let resources: OneOrMany<Resource> =
            self.send(self.request(Method::GET, &url, Some(token))).await?;

        let servers: Vec<ServerMeta> = resources
            .into_vec()
            .into_iter()
            .filter_map(Resource::into_server)
            .collect();

        tracing::debug!("Found {} Plex servers", servers.len());
        Ok(servers)
    }

    pub async fn list_sections(&self, server: &ServerMeta, token: &str) -> Result<Vec<SectionMeta>> {
        let url = format!("{}/library/sections", server.url());
        let data: MediaContainer<DirectoryList> =
            self.send(self.request(Method::GET, &url, Some(token))).await?;

        Ok(data
            .media_container
            .directory
            .into_iter()
            .map(|d| SectionMeta {
                key: d.key,
                title: d.title,
                kind: d.kind,
            })
            .collect())
    }

    /// Every item in the selected section, in library order, with full
    /// metadata fetched for each.
    pub async fn section_items(&self, access: &LibraryAccess) -> Result<Vec<Item>> {
        let url = format!(
            "{}/library/sections/{}/all",
            access.server.url(),
            access.section.key
        );
        let listing: MediaContainer<MetadataList> =
            self.send(self.request(Method::GET, &url, Some(&access.token))).await?;
        let entries = listing.media_container.metadata;

        tracing::info!(
            "Fetching metadata for {} items in section '{}'",
            entries.len(),
            access.section.title
        );

        stream::iter(entries)
            .map(|entry| async move {
                let full = self.item_metadata(access, &entry.rating_key).await?;
                Ok::<Item, AppError>(full.unwrap_or(entry).into())
            })
            .buffered(self.metadata_workers)
            .try_collect()
            .await
    }

    async fn item_metadata(&self, access: &LibraryAccess, rating_key: &str) -> Result<Option<Metadata>> {
        let url = format!("{}/library/metadata/{}", access.server.url(), rating_key);
        let data: MediaContainer<MetadataList> =
            self.send(self.request(Method::GET, &url, Some(&access.token))).await?;
        Ok(data.media_container.metadata.into_iter().next())
    }

    /// Direct media-server URL for an asset path such as a thumbnail.
    pub fn asset_url(&self, server: &ServerMeta, token: &str, path: &str) -> String {
        format!(
            "{}/{}?X-Plex-Token={}",
            server.url(),
            path.trim_start_matches('/'),
            urlencoding::encode(token)
        )
    }
}
