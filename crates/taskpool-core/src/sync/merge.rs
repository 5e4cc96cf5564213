//! Field-level merging of two versions of the same task.

use crate::sync::timestamp;
use crate::task::{MergeInfo, Task};
use chrono::Utc;

/// Separator inserted when both sides edited the description and neither
/// edit can be dropped.
pub const DESCRIPTION_SEPARATOR: &str = "\n\n--- merged from remote ---\n";

/// Merge two versions of one task.
///
/// A significant `updatedAt` gap means one side simply kept editing after
/// the other stopped; the later version wins wholesale. Near-simultaneous
/// edits are blended field by field, starting from a copy of the local
/// task, flagging `was_conflicted` whenever a field actually changes.
pub fn merge_single(local: &Task, remote: &Task) -> Task {
    let diff = timestamp::diff_ms(remote.updated_at, local.updated_at);

    if timestamp::is_significant(diff) {
        let winner = if remote.updated_at > local.updated_at {
            remote
        } else {
            local
        };
        let mut merged = winner.clone();
        merged.was_conflicted = true;
        return merged;
    }

    let mut merged = local.clone();
    let mut conflicted = false;

    // Priority only ever upgrades.
    if remote.priority.rank() > local.priority.rank() {
        merged.priority = remote.priority;
        conflicted = true;
    }

    // Completion is sticky: either side finishing the task finishes it.
    if remote.completed && !local.completed {
        merged.completed = true;
        conflicted = true;
    }

    // The longer title carries more information; ties keep local.
    if remote.title.len() > local.title.len() {
        merged.title = remote.title.clone();
        conflicted = true;
    }

    // Descriptions are never silently dropped: replace when remote is the
    // only or clearly newer author, otherwise concatenate both.
    if !remote.description.is_empty() && remote.description != local.description {
        if local.description.is_empty() || remote.updated_at > local.updated_at {
            merged.description = remote.description.clone();
        } else {
            merged.description = format!(
                "{}{}{}",
                local.description, DESCRIPTION_SEPARATOR, remote.description
            );
        }
        conflicted = true;
    }

    // The earlier deadline wins; a present deadline beats an absent one.
    if let Some(remote_deadline) = remote.deadline {
        let earlier = match merged.deadline {
            None => true,
            Some(local_deadline) => remote_deadline < local_deadline,
        };
        if earlier {
            merged.deadline = Some(remote_deadline);
            conflicted = true;
        }
    }

    // Tag union, local order first.
    for tag in &remote.tags {
        if !merged.tags.contains(tag) {
            merged.tags.push(tag.clone());
            conflicted = true;
        }
    }

    merged.updated_at = Utc::now();
    merged.was_conflicted = conflicted;
    merged.merge_info = Some(MergeInfo {
        local_source: local.source,
        remote_source: remote.source,
        merge_time: merged.updated_at,
        time_diff: diff,
    });

    merged
}
