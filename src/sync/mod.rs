//! Progress persistence
//!
//! Mirrors the reading position to a local cache and a hosted backend.

pub mod auth;
pub mod debounce;
pub mod error;
pub mod local;
pub mod record;
pub mod remote;
pub mod supabase;
pub mod synchronizer;

pub use auth::BackendKeyManager;
pub use error::SyncError;
pub use local::{FileCache, LocalCache, MemoryCache};
pub use record::{ExamResult, LocalSnapshot, ProgressRecord, StoreOutcome};
pub use remote::RemoteStore;
pub use supabase::SupabaseStore;
pub use synchronizer::{ProgressSync, RestoreSource, RestoredPosition, SyncSettings};
