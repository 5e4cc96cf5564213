//! Two-way task synchronization against a remote JSON document.
//!
//! Flow: the caller hands its tasks to [`SyncEngine::sync`], which
//! fetches the remote snapshot, reconciles both sides through
//! [`conflict_resolver::resolve`], uploads the result and reports back.
//! Conflicts resolve deterministically: a significant timestamp gap picks
//! a whole winner, near ties merge field by field.

pub mod conflict_resolver;
pub mod device_id;
pub mod engine;
pub mod gist_store;
pub mod merge;
pub mod remote;
pub mod sanitize;
pub mod timestamp;
pub mod types;

#[cfg(test)]
mod engine_tests;

pub use conflict_resolver::resolve;
pub use device_id::{get_or_create_device_id, get_or_create_device_id_at, DeviceIdError};
pub use engine::{RetryPolicy, SyncEngine};
pub use gist_store::GistStore;
pub use remote::{AlwaysOnline, Connectivity, NetworkType, RemoteStore};
pub use types::{
    CredentialCheck, DeviceInfo, ErrorKind, ResolutionStrategy, Snapshot, SyncError, SyncReport,
};
