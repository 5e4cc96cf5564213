//! Ports the sync engine talks through: the remote document store and a
//! connectivity probe.

use crate::sync::types::{CredentialCheck, Snapshot, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Abstract remote document store holding one snapshot as ground truth.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Retrieve the remote snapshot, implicitly seeding an empty document
    /// when the data file is absent.
    async fn fetch(&self) -> Result<Snapshot, SyncError>;

    /// Write an empty snapshot only if the data file is missing.
    async fn create_if_absent(&self) -> Result<(), SyncError>;

    /// Overwrite the stored document with `snapshot` plus device and sync
    /// metadata. Returns the upload instant stamped into the document.
    async fn replace(&self, snapshot: &Snapshot) -> Result<DateTime<Utc>, SyncError>;

    /// Health check for the configured credential. Problems come back as
    /// a structured result, never an error.
    async fn validate_credentials(&self) -> CredentialCheck;
}

/// Network reachability probe injected into the engine so orchestration
/// logic is testable without a real network stack.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;

    /// Best-effort link classification, used to pick a sync cadence.
    fn network_type(&self) -> NetworkType {
        NetworkType::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Wifi,
    Cellular,
    Unknown,
}

impl NetworkType {
    /// Suggested auto-sync interval in minutes for this link type.
    pub fn recommended_sync_interval(self) -> u32 {
        match self {
            NetworkType::Wifi => 5,
            NetworkType::Cellular => 15,
            NetworkType::Unknown => 10,
        }
    }
}

/// Default probe for environments without a reachability signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommended_intervals() {
        assert_eq!(NetworkType::Wifi.recommended_sync_interval(), 5);
        assert_eq!(NetworkType::Cellular.recommended_sync_interval(), 15);
        assert_eq!(NetworkType::Unknown.recommended_sync_interval(), 10);
    }

    #[test]
    fn always_online_defaults() {
        let probe = AlwaysOnline;
        assert!(probe.is_online());
        assert_eq!(probe.network_type(), NetworkType::Unknown);
    }
}
