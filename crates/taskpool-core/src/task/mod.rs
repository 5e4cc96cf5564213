//! Canonical task model shared by the local list and the synced document.
//!
//! Wire names are camelCase to stay byte-compatible with documents written
//! by other TaskPool clients.

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

/// Task priority. Merging never downgrades: the higher rank wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Ordering used by the merger: low=1, medium=2, high=3.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    /// Coerce arbitrary input; anything unrecognized becomes medium.
    pub fn from_str_lenient(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            _ => Priority::Medium,
        }
    }
}

/// Which side of a merge a task came from. Transient: only meaningful
/// while a resolve pass is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSource {
    Local,
    Remote,
    #[default]
    Unknown,
}

/// Provenance attached to a task produced by a field-level merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeInfo {
    pub local_source: TaskSource,
    pub remote_source: TaskSource,
    pub merge_time: DateTime<Utc>,
    /// Absolute `updatedAt` gap between the two sides, in milliseconds.
    pub time_diff: i64,
}

/// A task record with every recognized field populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub source: TaskSource,
    #[serde(default)]
    pub was_conflicted: bool,
    #[serde(default)]
    pub was_invalid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_info: Option<MergeInfo>,
}

impl Task {
    /// Fresh local task with sanitizer defaults applied.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generated_id("task"),
            title: title.into(),
            description: String::new(),
            priority: Priority::Medium,
            completed: false,
            tags: Vec::new(),
            deadline: None,
            created_at: now,
            updated_at: now,
            source: TaskSource::Local,
            was_conflicted: false,
            was_invalid: false,
            merge_info: None,
        }
    }
}

/// Id of the form `<prefix>_<millis>_<9 random alphanumerics>`, unique
/// enough to never collide within one snapshot.
pub fn generated_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!(
        "{}_{}_{}",
        prefix,
        Utc::now().timestamp_millis(),
        suffix.to_lowercase()
    )
}
