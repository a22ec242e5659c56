use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AuthToken = String;

/// A plex.tv PIN waiting to be claimed at plex.tv/link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pairing {
    pub id: i64,
    pub pin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMeta {
    pub name: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl ServerMeta {
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// A library section ("Movies", "TV Shows", ...) on a media server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionMeta {
    pub key: String,
    pub title: String,
    pub kind: String,
}

#[derive(Debug, Clone)]
pub struct SessionData {
    pub expires_at: DateTime<Utc>,
    pub pairing: Option<Pairing>,
    pub auth_token: Option<AuthToken>,
    pub servers: Option<Vec<ServerMeta>>,
    pub current_server: Option<ServerMeta>,
    pub current_section: Option<SectionMeta>,
}

impl SessionData {
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self {
            expires_at,
            pairing: None,
            auth_token: None,
            servers: None,
            current_server: None,
            current_section: None,
        }
    }

    /// Everything needed to list the library: a token, a server and a section.
    pub fn library_access(&self) -> Option<LibraryAccess> {
        Some(LibraryAccess {
            token: self.auth_token.clone()?,
            server: self.current_server.clone()?,
            section: self.current_section.clone()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LibraryAccess {
    pub token: AuthToken,
    pub server: ServerMeta,
    pub section: SectionMeta,
}
