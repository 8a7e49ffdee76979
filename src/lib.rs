// Freelance tracker - local store for job applications and client leads

pub mod analysis;
pub mod clock;
pub mod config;
pub mod export;
pub mod filter;
pub mod models;
pub mod storage;
pub mod store;
pub mod views;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BackendKind, Config};
pub use export::ExportFormat;
pub use filter::{FilterKey, FilterState, TimeRange};
pub use models::{Entry, EntryPatch, EntryStatus, EntryType, NewEntry, Stats};
pub use storage::{Backend, FileBackend, MemoryBackend, SqliteBackend};
pub use store::{Saved, Store};
