//! Sync orchestration: fetch, resolve, upload, with retry and backoff.
//!
//! One engine instance runs at most one operation at a time; a second
//! caller is rejected immediately rather than queued. Failures never
//! escape as errors -- every operation terminates in a [`SyncReport`].

use crate::storage::{KvStore, LAST_SYNC_KEY};
use crate::sync::conflict_resolver;
use crate::sync::remote::{AlwaysOnline, Connectivity, RemoteStore};
use crate::sync::timestamp;
use crate::sync::types::{CredentialCheck, DeviceInfo, Snapshot, SyncError, SyncReport};
use crate::task::Task;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ceiling for exponential backoff between retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Retry discipline for one engine operation: attempts = retries + 1,
/// delay doubles after each failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Full two-way sync: three retries, two-second initial delay.
    pub fn full_sync() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(2_000),
        }
    }

    /// One-way transfers: two retries, 1.5-second initial delay.
    pub fn transfer() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(1_500),
        }
    }
}

/// Orchestrates two-way synchronization between the caller's task list
/// and the remote document store.
pub struct SyncEngine<S: RemoteStore> {
    store: S,
    state: Arc<dyn KvStore>,
    connectivity: Arc<dyn Connectivity>,
    device_name: String,
    is_syncing: AtomicBool,
}

impl<S: RemoteStore> SyncEngine<S> {
    pub fn new(store: S, state: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            state,
            connectivity: Arc::new(AlwaysOnline),
            device_name: "taskpool".to_string(),
            is_syncing: AtomicBool::new(false),
        }
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    /// Whether an operation currently holds the engine.
    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::SeqCst)
    }

    /// Suggested auto-sync interval in minutes for the current link.
    pub fn recommended_sync_interval(&self) -> u32 {
        self.connectivity.network_type().recommended_sync_interval()
    }

    /// Two-way sync: fetch, resolve against `tasks`, upload the result.
    pub async fn sync(&self, tasks: &[Task]) -> SyncReport {
        self.sync_with(tasks, RetryPolicy::full_sync()).await
    }

    pub async fn sync_with(&self, tasks: &[Task], policy: RetryPolicy) -> SyncReport {
        self.run_with_retries("sync", "offline, cannot sync", policy, || {
            self.sync_once(tasks)
        })
        .await
    }

    /// Fetch the remote tasks without merging or uploading.
    pub async fn download_only(&self) -> SyncReport {
        self.download_only_with(RetryPolicy::transfer()).await
    }

    pub async fn download_only_with(&self, policy: RetryPolicy) -> SyncReport {
        self.run_with_retries("download", "offline, cannot download", policy, || {
            self.download_once()
        })
        .await
    }

    /// Upload the caller's tasks as-is: no fetch, no merge.
    pub async fn upload_only(&self, tasks: &[Task]) -> SyncReport {
        self.upload_only_with(tasks, RetryPolicy::transfer()).await
    }

    pub async fn upload_only_with(&self, tasks: &[Task], policy: RetryPolicy) -> SyncReport {
        self.run_with_retries("upload", "offline, cannot upload", policy, || {
            self.upload_once(tasks)
        })
        .await
    }

    /// Side-channel credential health check.
    pub async fn validate_credentials(&self) -> CredentialCheck {
        self.store.validate_credentials().await
    }

    async fn run_with_retries<'a, F, Fut>(
        &'a self,
        op: &str,
        offline_message: &str,
        policy: RetryPolicy,
        mut attempt: F,
    ) -> SyncReport
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<SyncReport, SyncError>> + 'a,
    {
        if !self.connectivity.is_online() {
            debug!(op, "rejected: offline");
            return SyncReport::offline(offline_message);
        }
        let Some(_guard) = self.acquire() else {
            debug!(op, "rejected: already in progress");
            return SyncReport::busy();
        };

        let mut delay = policy.initial_delay;
        let mut retries = 0;
        loop {
            debug!(op, attempt = retries + 1, "starting attempt");
            match attempt().await {
                Ok(report) => {
                    info!(op, retries, "completed");
                    return report.with_retries(retries);
                }
                Err(err) => {
                    warn!(op, attempt = retries + 1, error = %err, "attempt failed");
                    if retries >= policy.max_retries {
                        return SyncReport::failure(&err, retries);
                    }
                    if !self.connectivity.is_online() {
                        return SyncReport::disconnected(
                            "connection lost, aborting retries",
                            retries,
                        );
                    }
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, MAX_RETRY_DELAY);
                    retries += 1;
                }
            }
        }
        // Guard drop restores Idle on every exit path above.
    }

    async fn sync_once(&self, tasks: &[Task]) -> Result<SyncReport, SyncError> {
        let remote = self.store.fetch().await?;
        let local = self.local_snapshot(tasks);
        let resolved = conflict_resolver::resolve(&local, &remote);
        let uploaded_at = self.store.replace(&resolved).await?;
        self.set_last_sync(uploaded_at)?;

        Ok(SyncReport {
            synced_tasks: Some(resolved.tasks.len()),
            last_sync: Some(uploaded_at),
            conflict_resolved: resolved.conflict_resolved,
            tasks: Some(resolved.tasks),
            ..SyncReport::succeeded("sync complete")
        })
    }

    async fn download_once(&self) -> Result<SyncReport, SyncError> {
        let remote = self.store.fetch().await?;
        Ok(SyncReport {
            synced_tasks: Some(remote.tasks.len()),
            last_sync: remote.last_sync,
            tasks: Some(remote.tasks),
            ..SyncReport::succeeded("download complete")
        })
    }

    async fn upload_once(&self, tasks: &[Task]) -> Result<SyncReport, SyncError> {
        let local = self.local_snapshot(tasks);
        let uploaded_at = self.store.replace(&local).await?;
        self.set_last_sync(uploaded_at)?;
        Ok(SyncReport {
            synced_tasks: Some(local.tasks.len()),
            last_sync: Some(uploaded_at),
            ..SyncReport::succeeded("upload complete")
        })
    }

    /// Wrap the caller's tasks with persisted sync state and device info.
    fn local_snapshot(&self, tasks: &[Task]) -> Snapshot {
        Snapshot {
            tasks: tasks.to_vec(),
            last_sync: self.last_sync(),
            device_info: Some(DeviceInfo {
                name: self.device_name.clone(),
                sync_time: None,
                last_local_update: Some(Utc::now()),
            }),
            ..Snapshot::default()
        }
    }

    fn last_sync(&self) -> Option<DateTime<Utc>> {
        match self.state.get(LAST_SYNC_KEY) {
            Ok(value) => value.as_deref().and_then(timestamp::parse_opt),
            Err(err) => {
                warn!(error = %err, "could not read last-sync state");
                None
            }
        }
    }

    fn set_last_sync(&self, at: DateTime<Utc>) -> Result<(), SyncError> {
        self.state.set(LAST_SYNC_KEY, &at.to_rfc3339())?;
        Ok(())
    }

    fn acquire(&self) -> Option<SyncGuard<'_>> {
        self.is_syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        Some(SyncGuard {
            flag: &self.is_syncing,
        })
    }
}

/// Releases the in-flight flag on every exit path.
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
