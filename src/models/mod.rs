pub mod item;
pub mod session;

pub use item::Item;
pub use session::{AuthToken, LibraryAccess, Pairing, SectionMeta, ServerMeta, SessionData};
