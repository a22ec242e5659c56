pub mod plex;
pub mod sessions;

pub use plex::PlexClient;
pub use sessions::SessionStore;
