//! # TaskPool Core Library
//!
//! Core business logic for TaskPool's offline-first task synchronization.
//! A local task list and a remote JSON document are reconciled through a
//! deterministic conflict resolver; transient network failure is absorbed
//! by sequential retries with exponential backoff. The library never
//! panics on foreign data: malformed records are defaulted, not rejected.
//!
//! ## Key components
//!
//! - [`SyncEngine`]: orchestrates fetch, resolve, and upload with retry,
//!   backoff, and mutual exclusion
//! - [`GistStore`]: the gist-backed remote document store
//! - [`resolve`](sync::resolve): pure snapshot reconciliation
//! - [`SyncConfigStore`]: persisted connection settings
//! - [`KvStore`]: the injected persistence port (file or memory backed)

pub mod storage;
pub mod sync;
pub mod task;

pub use storage::{
    data_dir, JsonFileStore, KvStore, MemoryStore, StorageError, SyncConfigStore, SyncSettings,
    SyncState,
};
pub use sync::{
    resolve, AlwaysOnline, Connectivity, CredentialCheck, DeviceInfo, ErrorKind, GistStore,
    NetworkType, RemoteStore, ResolutionStrategy, RetryPolicy, Snapshot, SyncEngine, SyncError,
    SyncReport,
};
pub use task::{MergeInfo, Priority, Task, TaskSource};
