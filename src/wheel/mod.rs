//! The wheel client: everything that runs on the user's side of `/list`.
//!
//! Nothing in here touches a UI toolkit. The cache, filters and selection
//! engine are plain values; collaborators (listing service, session check,
//! presentation, storage) come in through traits.

pub mod app;
pub mod cache;
pub mod filters;
pub mod remote;
pub mod selection;
pub mod storage;
pub mod wrap;

pub use app::{Navigation, SessionValidator, WheelApp};
pub use cache::{LibraryCache, LibrarySource};
pub use filters::{eligible, Filter, FilterSet};
pub use remote::RemoteLibrary;
pub use selection::{Phase, Presenter, SelectionEngine, SelectionState, Spin};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

use std::time::Duration;

/// How long a cached library stays fresh.
pub const CACHE_TTL_SECS: i64 = 60 * 60 * 24;
/// Candidates shown per spin.
pub const OPTIONS: usize = 8;
/// Segment labels wrap after this many characters.
pub const BREAK_AT_CHARS: usize = 20;
/// Length of the spin presentation (the wheel music).
pub const SONG_LENGTH: Duration = Duration::from_millis(4700);
/// Where the user is sent when the session or the library is unusable.
pub const ENTRY_ROUTE: &str = "/";

pub const PALETTE: [&str; 9] = [
    "#f94144", "#f3722c", "#f8961e", "#f9c74f", "#90be6d", "#43aa8b", "#4d908e", "#577590",
    "#277da1",
];

#[derive(Debug, Clone)]
pub struct WheelSettings {
    pub options: usize,
    pub break_at: usize,
    pub song_length: Duration,
}

impl Default for WheelSettings {
    fn default() -> Self {
        Self {
            options: OPTIONS,
            break_at: BREAK_AT_CHARS,
            song_length: SONG_LENGTH,
        }
    }
}
