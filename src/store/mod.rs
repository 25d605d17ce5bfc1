//! Application store: pages and global regions, selection routing,
//! routed edits and persistence

mod app;
mod ops;
mod persistence;
mod selection;

pub use app::{container_columns, region_columns, AppPayload, Page, PageLayout};
pub use ops::{BuilderStore, StoreError};
pub use persistence::{FileBackend, MemoryBackend, PersistError, PersistenceBackend, SaveScheduler};
pub use selection::{EditorSession, Selection, SelectionMode, TreeScope};
