//! Normalization of foreign records into canonical shapes.
//!
//! Synced documents are written by other devices and other client
//! versions, so nothing here is allowed to fail: malformed tasks become
//! flagged placeholders and malformed fields fall back to defaults.

use crate::sync::timestamp;
use crate::sync::types::{Snapshot, SyncError};
use crate::task::{generated_id, Priority, Task, TaskSource};
use chrono::Utc;
use serde_json::Value;

const UNTITLED_TITLE: &str = "Untitled task";
const INVALID_TITLE: &str = "Invalid task";

/// Normalize an arbitrary task-like value into a canonical [`Task`].
/// Non-object input yields a placeholder flagged `was_invalid`.
pub fn sanitize_task(raw: &Value, source: TaskSource) -> Task {
    let Some(record) = raw.as_object() else {
        let now = Utc::now();
        return Task {
            id: generated_id("invalid"),
            title: INVALID_TITLE.to_string(),
            description: String::new(),
            priority: Priority::Medium,
            completed: false,
            tags: Vec::new(),
            deadline: None,
            created_at: now,
            updated_at: now,
            source,
            was_conflicted: false,
            was_invalid: true,
            merge_info: None,
        };
    };

    let str_field = |key: &str| record.get(key).and_then(Value::as_str);

    let id = str_field("id")
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| generated_id("generated"));

    let created_at = match str_field("createdAt") {
        Some(raw) => timestamp::parse(Some(raw)),
        None => Utc::now(),
    };
    let updated_at = match str_field("updatedAt") {
        Some(raw) => timestamp::parse(Some(raw)),
        None => created_at,
    };

    Task {
        id,
        title: str_field("title")
            .filter(|s| !s.is_empty())
            .unwrap_or(UNTITLED_TITLE)
            .to_string(),
        description: str_field("description").unwrap_or_default().to_string(),
        priority: str_field("priority")
            .map(Priority::from_str_lenient)
            .unwrap_or_default(),
        completed: record.get("completed").map(truthy).unwrap_or(false),
        tags: record
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        deadline: str_field("deadline").and_then(timestamp::parse_opt),
        created_at,
        updated_at,
        source,
        was_conflicted: false,
        was_invalid: false,
        merge_info: None,
    }
}

/// Coerce a parsed document into a [`Snapshot`], sanitizing each task.
/// Fails only when `tasks` is missing or not an array.
pub fn snapshot_from_value(raw: &Value, source: TaskSource) -> Result<Snapshot, SyncError> {
    let tasks = raw
        .get("tasks")
        .and_then(Value::as_array)
        .ok_or_else(|| SyncError::DataFormat("document is missing a tasks array".to_string()))?;

    Ok(Snapshot {
        tasks: tasks.iter().map(|t| sanitize_task(t, source)).collect(),
        last_sync: raw
            .get("lastSync")
            .and_then(Value::as_str)
            .and_then(timestamp::parse_opt),
        version: raw
            .get("version")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("1.0")
            .to_string(),
        ..Snapshot::default()
    })
}

/// Lenient truthiness for fields written by older clients.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_object_becomes_flagged_placeholder() {
        let task = sanitize_task(&json!("just a string"), TaskSource::Remote);
        assert!(task.was_invalid);
        assert!(task.id.starts_with("invalid_"));
        assert_eq!(task.title, INVALID_TITLE);
        assert_eq!(task.source, TaskSource::Remote);
    }

    #[test]
    fn null_becomes_flagged_placeholder() {
        let task = sanitize_task(&Value::Null, TaskSource::Local);
        assert!(task.was_invalid);
    }

    #[test]
    fn empty_object_gets_every_default() {
        let task = sanitize_task(&json!({}), TaskSource::Local);
        assert!(!task.was_invalid);
        assert!(task.id.starts_with("generated_"));
        assert_eq!(task.title, UNTITLED_TITLE);
        assert_eq!(task.description, "");
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
        assert!(task.tags.is_empty());
        assert!(task.deadline.is_none());
        assert_eq!(task.updated_at, task.created_at);
        assert!(!task.was_conflicted);
    }

    #[test]
    fn updated_at_defaults_to_created_at() {
        let task = sanitize_task(
            &json!({"id": "t1", "createdAt": "2024-05-01T12:00:00Z"}),
            TaskSource::Local,
        );
        assert_eq!(task.updated_at, task.created_at);
        assert_eq!(
            task.created_at,
            timestamp::parse(Some("2024-05-01T12:00:00Z"))
        );
    }

    #[test]
    fn completed_coerces_loose_values() {
        for (value, expected) in [
            (json!(true), true),
            (json!(1), true),
            (json!("yes"), true),
            (json!(false), false),
            (json!(0), false),
            (json!(""), false),
            (Value::Null, false),
        ] {
            let task = sanitize_task(&json!({"id": "t", "completed": value}), TaskSource::Local);
            assert_eq!(task.completed, expected);
        }
    }

    #[test]
    fn bad_deadline_is_dropped() {
        let task = sanitize_task(
            &json!({"id": "t", "deadline": "someday"}),
            TaskSource::Local,
        );
        assert!(task.deadline.is_none());
    }

    #[test]
    fn non_string_tags_are_skipped() {
        let task = sanitize_task(
            &json!({"id": "t", "tags": ["work", 7, null, "home"]}),
            TaskSource::Local,
        );
        assert_eq!(task.tags, vec!["work".to_string(), "home".to_string()]);
    }

    #[test]
    fn sanitize_is_idempotent_on_canonical_tasks() {
        let first = sanitize_task(
            &json!({
                "id": "stable",
                "title": "Report",
                "description": "quarterly numbers",
                "priority": "high",
                "completed": true,
                "tags": ["work"],
                "createdAt": "2024-05-01T12:00:00Z",
                "updatedAt": "2024-05-02T12:00:00Z",
            }),
            TaskSource::Local,
        );
        let second = sanitize_task(
            &serde_json::to_value(&first).unwrap(),
            TaskSource::Local,
        );
        assert_eq!(second, first);
    }

    #[test]
    fn snapshot_requires_tasks_array() {
        let err = snapshot_from_value(&json!({"tasks": 42}), TaskSource::Remote).unwrap_err();
        assert!(matches!(err, SyncError::DataFormat(_)));
        let err = snapshot_from_value(&json!({}), TaskSource::Remote).unwrap_err();
        assert!(matches!(err, SyncError::DataFormat(_)));
    }

    #[test]
    fn snapshot_defaults_version_and_last_sync() {
        let snapshot =
            snapshot_from_value(&json!({"tasks": [], "lastSync": null}), TaskSource::Remote)
                .unwrap();
        assert_eq!(snapshot.version, "1.0");
        assert!(snapshot.last_sync.is_none());
        assert!(snapshot.tasks.is_empty());
    }

    #[test]
    fn snapshot_tags_task_sources() {
        let snapshot = snapshot_from_value(
            &json!({"tasks": [{"id": "a"}], "lastSync": "2024-05-01T12:00:00Z"}),
            TaskSource::Remote,
        )
        .unwrap();
        assert_eq!(snapshot.tasks[0].source, TaskSource::Remote);
        assert!(snapshot.last_sync.is_some());
    }
}
