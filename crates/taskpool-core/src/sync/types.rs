//! Core types for task-list synchronization.

use crate::storage::StorageError;
use crate::task::Task;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a resolve pass settled the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// One side was clearly fresher; its task list won wholesale.
    TimeBased,
    /// Timestamps were close; tasks were merged id by id.
    DetailedMerge,
}

/// Identity of the device that last touched the remote document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_local_update: Option<DateTime<Utc>>,
}

/// A full, timestamped view of the task collection plus sync metadata,
/// exchanged atomically with the remote store. Every pipeline stage
/// produces a new snapshot; none mutates its input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub conflict_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_strategy: Option<ResolutionStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "timeDiff",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_diff_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            last_sync: None,
            version: default_version(),
            conflict_resolved: false,
            resolution_strategy: None,
            resolution_time: None,
            time_diff_ms: None,
            conflicts: Vec::new(),
            device_info: None,
        }
    }
}

impl Snapshot {
    /// The seed document written when the remote data file is absent.
    pub fn initial() -> Self {
        Self {
            last_sync: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// Result of a credential health check. Always structured, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialCheck {
    pub valid: bool,
    pub message: String,
}

/// Machine-checkable failure classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Auth,
    Permission,
    NotFound,
    DataFormat,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Auth => "auth",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::DataFormat => "data_format",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Sync failure raised by the remote store or orchestration steps.
/// The engine converts every one of these into a [`SyncReport`]; none
/// escape its public operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("credential rejected: {0}")]
    Unauthorized(String),

    #[error("access forbidden: {0}")]
    Forbidden(String),

    #[error("remote document not found: {0}")]
    NotFound(String),

    #[error("remote data format invalid: {0}")]
    DataFormat(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("local storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Other(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Network(_) => ErrorKind::Network,
            SyncError::Http(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                ErrorKind::Network
            }
            SyncError::Http(e) => match e.status() {
                Some(status) if status.as_u16() == 401 => ErrorKind::Auth,
                Some(status) if status.as_u16() == 403 => ErrorKind::Permission,
                Some(status) if status.as_u16() == 404 => ErrorKind::NotFound,
                _ => ErrorKind::Unknown,
            },
            SyncError::Unauthorized(_) => ErrorKind::Auth,
            SyncError::Forbidden(_) => ErrorKind::Permission,
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::DataFormat(_) | SyncError::Serialization(_) => ErrorKind::DataFormat,
            SyncError::Storage(_) => ErrorKind::Unknown,
            SyncError::Other(message) => classify_message(message),
        }
    }
}

/// Fallback classification for untyped failures, keyed off the error text.
/// Deliberately coarse; typed variants take precedence.
pub fn classify_message(message: &str) -> ErrorKind {
    let m = message.to_lowercase();
    let contains_any = |keys: &[&str]| keys.iter().any(|k| m.contains(k));

    if contains_any(&["network", "offline", "timeout", "connection", "unreachable"]) {
        ErrorKind::Network
    } else if contains_any(&["401", "unauthorized", "invalid token"]) {
        ErrorKind::Auth
    } else if contains_any(&["403", "forbidden"]) {
        ErrorKind::Permission
    } else if contains_any(&["404", "not found"]) {
        ErrorKind::NotFound
    } else if contains_any(&["invalid format", "parse", "invalid data"]) {
        ErrorKind::DataFormat
    } else {
        ErrorKind::Unknown
    }
}

/// Outcome of one engine operation. Every terminal state carries a
/// human-readable message, a machine-checkable kind on failure, and the
/// number of retries consumed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_tasks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    pub conflict_resolved: bool,
    #[serde(rename = "errorType", skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub retries: u32,
}

impl SyncReport {
    fn base(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
            tasks: None,
            synced_tasks: None,
            last_sync: None,
            conflict_resolved: false,
            error_kind: None,
            retries: 0,
        }
    }

    pub fn succeeded(message: impl Into<String>) -> Self {
        Self::base(true, message)
    }

    /// Immediate rejection while another operation holds the engine.
    pub fn busy() -> Self {
        Self::base(false, "sync already in progress")
    }

    /// Immediate rejection because the host is offline.
    pub fn offline(message: impl Into<String>) -> Self {
        Self {
            error_kind: Some(ErrorKind::Network),
            ..Self::base(false, message)
        }
    }

    /// The connection dropped between retry attempts.
    pub fn disconnected(message: impl Into<String>, retries: u32) -> Self {
        Self {
            error_kind: Some(ErrorKind::Network),
            retries,
            ..Self::base(false, message)
        }
    }

    /// Terminal failure after exhausting retries.
    pub fn failure(error: &SyncError, retries: u32) -> Self {
        Self {
            error_kind: Some(error.kind()),
            retries,
            ..Self::base(false, error.to_string())
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}
