//! Snapshot-level conflict resolution.
//!
//! Pure: takes two snapshots and produces a resolved one. No network or
//! storage side effects happen here.

use crate::sync::merge;
use crate::sync::timestamp;
use crate::sync::types::{ResolutionStrategy, Snapshot};
use crate::task::{Task, TaskSource};
use chrono::Utc;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, info};

/// Reconcile a local and a remote snapshot into a new one.
///
/// A significant `lastSync` gap means one side was offline and is stale;
/// the fresher side wins wholesale so stray merges cannot contaminate it.
/// Otherwise tasks are merged id by id at task granularity.
pub fn resolve(local: &Snapshot, remote: &Snapshot) -> Snapshot {
    let local_time = timestamp::or_epoch(local.last_sync);
    let remote_time = timestamp::or_epoch(remote.last_sync);
    let diff = timestamp::diff_ms(remote_time, local_time);

    debug!(
        local_tasks = local.tasks.len(),
        remote_tasks = remote.tasks.len(),
        diff_ms = diff,
        "resolving snapshots"
    );

    let (tasks, conflicts, strategy) = if timestamp::is_significant(diff) {
        let (winner, source) = if remote_time > local_time {
            (remote, TaskSource::Remote)
        } else {
            (local, TaskSource::Local)
        };
        info!(side = ?source, diff_ms = diff, "time-based resolution");
        let tasks = winner.tasks.iter().map(|t| tag(t, source)).collect();
        (tasks, Vec::new(), ResolutionStrategy::TimeBased)
    } else {
        let (tasks, conflicts) = merge_collections(&local.tasks, &remote.tasks);
        info!(
            tasks = tasks.len(),
            conflicts = conflicts.len(),
            "detailed merge"
        );
        (tasks, conflicts, ResolutionStrategy::DetailedMerge)
    };

    let now = Utc::now();
    Snapshot {
        tasks,
        last_sync: Some(now),
        version: bump_version(&local.version),
        conflict_resolved: true,
        resolution_strategy: Some(strategy),
        resolution_time: Some(now),
        time_diff_ms: Some(diff),
        conflicts,
        device_info: None,
    }
}

/// Merge two task collections keyed by id. Local tasks keep their order
/// and remote-only tasks append in remote order; a duplicated id within
/// one side keeps its last occurrence.
pub fn merge_collections(local: &[Task], remote: &[Task]) -> (Vec<Task>, Vec<String>) {
    let mut tasks: Vec<Task> = Vec::with_capacity(local.len() + remote.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut conflicts = Vec::new();

    for task in local {
        let task = tag(task, TaskSource::Local);
        match index.entry(task.id.clone()) {
            Entry::Occupied(slot) => tasks[*slot.get()] = task,
            Entry::Vacant(slot) => {
                slot.insert(tasks.len());
                tasks.push(task);
            }
        }
    }

    for task in remote {
        let task = tag(task, TaskSource::Remote);
        match index.entry(task.id.clone()) {
            Entry::Occupied(slot) => {
                let merged = merge::merge_single(&tasks[*slot.get()], &task);
                if merged.was_conflicted {
                    conflicts.push(merged.id.clone());
                }
                tasks[*slot.get()] = merged;
            }
            Entry::Vacant(slot) => {
                slot.insert(tasks.len());
                tasks.push(task);
            }
        }
    }

    (tasks, conflicts)
}

fn tag(task: &Task, source: TaskSource) -> Task {
    Task {
        source,
        ..task.clone()
    }
}

/// "1.0" -> "1.1"; anything unparseable resets to "1.1".
fn bump_version(version: &str) -> String {
    let mut parts = version.splitn(2, '.');
    let major = parts.next().and_then(|p| p.parse::<u32>().ok());
    let minor = parts.next().and_then(|p| p.parse::<u32>().ok());
    match (major, minor) {
        (Some(major), Some(minor)) => format!("{}.{}", major, minor + 1),
        _ => "1.1".to_string(),
    }
}

#[cfg(test)]
pub(crate) fn bump_version_for_tests(version: &str) -> String {
    bump_version(version)
}
