//! Tests for sync-engine orchestration: mutual exclusion, retry,
//! backoff, and offline handling, all against an in-process mock store.

#[cfg(test)]
mod tests {
    use super::super::engine::{RetryPolicy, SyncEngine};
    use super::super::remote::{Connectivity, RemoteStore};
    use super::super::types::{CredentialCheck, ErrorKind, Snapshot, SyncError};
    use crate::storage::{KvStore, MemoryStore, LAST_SYNC_KEY};
    use crate::task::Task;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn upload_stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[derive(Default)]
    struct MockStore {
        /// Scripted fetch outcomes; empty queue means an empty snapshot.
        fetch_results: Mutex<VecDeque<Result<Snapshot, SyncError>>>,
        fetch_calls: AtomicUsize,
        replace_calls: AtomicUsize,
        /// When set, fetch blocks until notified.
        gate: Option<Arc<Notify>>,
        entered: Arc<Notify>,
    }

    impl MockStore {
        fn script_fetch_errors(&self, errors: impl IntoIterator<Item = SyncError>) {
            let mut results = self.fetch_results.lock().unwrap();
            for error in errors {
                results.push_back(Err(error));
            }
        }
    }

    #[async_trait::async_trait]
    impl RemoteStore for Arc<MockStore> {
        async fn fetch(&self) -> Result<Snapshot, SyncError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match self.fetch_results.lock().unwrap().pop_front() {
                Some(result) => result,
                None => Ok(Snapshot::default()),
            }
        }

        async fn create_if_absent(&self) -> Result<(), SyncError> {
            Ok(())
        }

        async fn replace(&self, _snapshot: &Snapshot) -> Result<DateTime<Utc>, SyncError> {
            self.replace_calls.fetch_add(1, Ordering::SeqCst);
            Ok(upload_stamp())
        }

        async fn validate_credentials(&self) -> CredentialCheck {
            CredentialCheck {
                valid: true,
                message: "ok".to_string(),
            }
        }
    }

    struct Offline;

    impl Connectivity for Offline {
        fn is_online(&self) -> bool {
            false
        }
    }

    /// Pops one scripted state per probe; defaults to online afterwards.
    struct Scripted {
        states: Mutex<VecDeque<bool>>,
    }

    impl Scripted {
        fn new(states: &[bool]) -> Self {
            Self {
                states: Mutex::new(states.iter().copied().collect()),
            }
        }
    }

    impl Connectivity for Scripted {
        fn is_online(&self) -> bool {
            self.states.lock().unwrap().pop_front().unwrap_or(true)
        }
    }

    fn build_engine(
        store: &Arc<MockStore>,
    ) -> (SyncEngine<Arc<MockStore>>, Arc<MemoryStore>) {
        let state = Arc::new(MemoryStore::new());
        (SyncEngine::new(store.clone(), state.clone()), state)
    }

    #[tokio::test]
    async fn offline_rejects_without_touching_the_store() {
        let store = Arc::new(MockStore::default());
        let (engine, _) = build_engine(&store);
        let engine = engine.with_connectivity(Arc::new(Offline));

        let report = engine.sync(&[]).await;

        assert!(!report.success);
        assert_eq!(report.error_kind, Some(ErrorKind::Network));
        assert_eq!(report.retries, 0);
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_sync_is_rejected_immediately() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(MockStore {
            gate: Some(gate.clone()),
            ..MockStore::default()
        });
        let (engine, _) = build_engine(&store);
        let engine = Arc::new(engine);

        let in_flight = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.sync(&[]).await })
        };
        store.entered.notified().await;

        // Second caller bounces without a single store call of its own.
        let busy = engine.sync(&[]).await;
        assert!(!busy.success);
        assert_eq!(busy.message, "sync already in progress");
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 1);

        gate.notify_one();
        let first = in_flight.await.unwrap();
        assert!(first.success);
        assert!(!engine.is_syncing());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_report_the_final_error_kind() {
        let store = Arc::new(MockStore::default());
        store.script_fetch_errors((0..4).map(|_| SyncError::DataFormat("tasks missing".into())));
        let (engine, _) = build_engine(&store);

        let report = engine.sync(&[]).await;

        assert!(!report.success);
        assert_eq!(report.retries, 3);
        assert_eq!(report.error_kind, Some(ErrorKind::DataFormat));
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 4);
        assert!(!engine.is_syncing());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_recovers_and_counts_retries() {
        let store = Arc::new(MockStore::default());
        store.script_fetch_errors([SyncError::Network("connection reset".into())]);
        let (engine, _) = build_engine(&store);

        let report = engine.sync(&[Task::new("One")]).await;

        assert!(report.success);
        assert_eq!(report.retries, 1);
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn successful_sync_persists_last_sync_state() {
        let store = Arc::new(MockStore::default());
        let (engine, state) = build_engine(&store);
        let tasks = vec![Task::new("One"), Task::new("Two")];

        let report = engine.sync(&tasks).await;

        assert!(report.success);
        assert_eq!(report.synced_tasks, Some(2));
        assert!(report.conflict_resolved);
        assert_eq!(report.last_sync, Some(upload_stamp()));
        let stored = state.get(LAST_SYNC_KEY).unwrap().expect("persisted stamp");
        assert_eq!(stored, upload_stamp().to_rfc3339());
    }

    #[tokio::test]
    async fn connection_loss_between_retries_aborts_as_network() {
        let store = Arc::new(MockStore::default());
        store.script_fetch_errors([
            SyncError::Other("flaky".into()),
            SyncError::Other("flaky".into()),
        ]);
        let (engine, _) = build_engine(&store);
        // Online at entry, gone when the first retry is considered.
        let engine = engine.with_connectivity(Arc::new(Scripted::new(&[true, false])));

        let report = engine.sync(&[]).await;

        assert!(!report.success);
        assert_eq!(report.error_kind, Some(ErrorKind::Network));
        assert_eq!(report.retries, 0);
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upload_only_never_fetches() {
        let store = Arc::new(MockStore::default());
        let (engine, state) = build_engine(&store);

        let report = engine.upload_only(&[Task::new("One")]).await;

        assert!(report.success);
        assert_eq!(report.synced_tasks, Some(1));
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.replace_calls.load(Ordering::SeqCst), 1);
        assert!(state.get(LAST_SYNC_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn download_only_never_replaces() {
        let store = Arc::new(MockStore::default());
        {
            let mut results = store.fetch_results.lock().unwrap();
            results.push_back(Ok(Snapshot {
                tasks: vec![Task::new("Remote one"), Task::new("Remote two")],
                ..Snapshot::default()
            }));
        }
        let (engine, _) = build_engine(&store);

        let report = engine.download_only().await;

        assert!(report.success);
        assert_eq!(report.tasks.as_ref().map(Vec::len), Some(2));
        assert_eq!(store.replace_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_and_is_capped() {
        let store = Arc::new(MockStore::default());
        store.script_fetch_errors((0..4).map(|_| SyncError::Other("down".into())));
        let (engine, _) = build_engine(&store);

        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_secs(20),
        };
        let started = tokio::time::Instant::now();
        let report = engine.sync_with(&[], policy).await;

        // Delays: 20s, then 40s capped to 30s, then 30s again.
        let elapsed = started.elapsed();
        assert_eq!(report.retries, 3);
        assert!(elapsed >= Duration::from_secs(80), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(81), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn validate_credentials_passes_through() {
        let store = Arc::new(MockStore::default());
        let (engine, _) = build_engine(&store);
        let check = engine.validate_credentials().await;
        assert!(check.valid);
    }
}
