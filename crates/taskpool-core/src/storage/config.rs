//! Sync connection settings persisted through the key-value port.

use super::{get_json_or, KvStore, StorageError, LAST_SYNC_KEY};
use crate::sync::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Key under which [`SyncSettings`] are stored.
pub const CONFIG_KEY: &str = "taskpool_sync_config";

fn default_sync_interval() -> u32 {
    5
}

/// Lifecycle of the sync connection as shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    NotConfigured,
    Configured,
    Syncing,
    Synced,
    Error,
}

/// User-supplied connection settings plus last-known status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// Pre-issued personal access token with gist scope.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub gist_id: String,
    #[serde(default)]
    pub auto_sync: bool,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_minutes: u32,
    #[serde(default)]
    pub status: SyncState,
    #[serde(default)]
    pub last_error: String,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            gist_id: String::new(),
            auto_sync: false,
            sync_interval_minutes: default_sync_interval(),
            status: SyncState::NotConfigured,
            last_error: String::new(),
            last_sync: None,
            updated_at: None,
        }
    }
}

/// Persists [`SyncSettings`] and the shared last-sync timestamp.
pub struct SyncConfigStore {
    kv: Arc<dyn KvStore>,
}

impl SyncConfigStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Load settings, falling back to defaults when absent or corrupt.
    pub fn load(&self) -> SyncSettings {
        get_json_or(self.kv.as_ref(), CONFIG_KEY, SyncSettings::default)
    }

    /// Persist settings with a fresh `updated_at` stamp; returns what was
    /// written.
    pub fn save(&self, settings: &SyncSettings) -> Result<SyncSettings, StorageError> {
        let stamped = SyncSettings {
            updated_at: Some(Utc::now()),
            ..settings.clone()
        };
        self.kv.set(CONFIG_KEY, &serde_json::to_string(&stamped)?)?;
        Ok(stamped)
    }

    /// Remove settings and the shared last-sync timestamp.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.kv.remove(CONFIG_KEY)?;
        self.kv.remove(LAST_SYNC_KEY)?;
        Ok(())
    }

    /// Validation problems with the given settings, empty when usable.
    pub fn validate(settings: &SyncSettings) -> Vec<String> {
        let mut errors = Vec::new();
        if settings.token.trim().is_empty() {
            errors.push("token must not be empty".to_string());
        }
        if settings.gist_id.trim().is_empty() {
            errors.push("gist id must not be empty".to_string());
        }
        if settings.sync_interval_minutes < 1 {
            errors.push("sync interval must be at least 1 minute".to_string());
        }
        errors
    }

    /// Record a status transition. A successful sync clears the error and
    /// stamps `last_sync`; a message overwrites the stored error text.
    pub fn update_status(&self, status: SyncState, message: &str) -> Result<(), StorageError> {
        let mut settings = self.load();
        settings.status = status;
        if !message.is_empty() {
            settings.last_error = message.to_string();
        }
        if status == SyncState::Synced {
            settings.last_sync = Some(Utc::now());
            settings.last_error.clear();
        }
        self.save(&settings)?;
        Ok(())
    }

    /// The engine-shared last successful sync instant.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        match self.kv.get(LAST_SYNC_KEY) {
            Ok(value) => value.as_deref().and_then(timestamp::parse_opt),
            Err(_) => None,
        }
    }
}
