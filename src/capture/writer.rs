//! Bounded asynchronous write queue for captured snapshots.
//!
//! # Responsibilities
//! - Accept writes from the proxy data path without ever blocking it
//! - Execute writes concurrently, each attempt under a deadline
//! - Retry transient store failures with backoff
//! - Make failures observable (logs + metrics) instead of surfacing them
//!
//! # Design Decisions
//! - `submit` uses `try_send`: a full queue drops the write and counts it
//! - Index appends are routed by key onto sequential lanes, so a list grows
//!   in capture order; content writes run concurrently
//! - A pending counter covers queued and in-flight writes, so `flush` and
//!   shutdown drain can wait for the store to catch up

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify, Semaphore};
use tokio::task::JoinHandle;

use crate::capture::ExchangeId;
use crate::observability::metrics;
use crate::repository::{ContentKey, ExchangeContent, IndexKey, Repository};
use crate::resilience::retries::RetryPolicy;

/// One store write produced by a capture.
#[derive(Debug, Clone)]
pub enum WriteJob {
    AppendIndex { index: IndexKey, id: ExchangeId },
    PutContent { key: ContentKey, content: ExchangeContent },
}

impl WriteJob {
    pub fn op(&self) -> &'static str {
        match self {
            WriteJob::AppendIndex { .. } => "append_index",
            WriteJob::PutContent { .. } => "put_content",
        }
    }

    fn target(&self) -> String {
        match self {
            WriteJob::AppendIndex { index, .. } => index.to_string(),
            WriteJob::PutContent { key, .. } => key.to_string(),
        }
    }

    async fn apply(&self, repository: &Repository, ttl: Duration) -> crate::error::Result<()> {
        match self {
            WriteJob::AppendIndex { index, id } => repository.append_to_index(index, id).await,
            WriteJob::PutContent { key, content } => repository.put_content(key, content, ttl).await,
        }
    }
}

/// Writer tuning.
#[derive(Debug, Clone, Copy)]
pub struct WriterSettings {
    pub queue_capacity: usize,
    pub workers: usize,
    /// Expiry applied to content snapshots.
    pub content_ttl: Duration,
    pub retry: RetryPolicy,
}

#[derive(Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl Pending {
    fn add(&self) -> usize {
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn done(&self) {
        let left = self.count.fetch_sub(1, Ordering::AcqRel) - 1;
        metrics::record_queue_depth(left);
        if left == 0 {
            self.idle.notify_waiters();
        }
    }
}

/// Marks one write finished when dropped, whatever path the task took.
struct PendingGuard(Arc<Pending>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.done();
    }
}

/// Handle for submitting writes. Cheap to clone.
#[derive(Clone)]
pub struct CaptureWriter {
    tx: mpsc::Sender<WriteJob>,
    pending: Arc<Pending>,
}

impl CaptureWriter {
    /// Start the dispatcher. The returned task ends once every handle is dropped
    /// and the queue is empty.
    pub fn spawn(repository: Repository, settings: WriterSettings) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let pending = Arc::new(Pending::default());
        let task = tokio::spawn(dispatch(rx, repository, settings, Arc::clone(&pending)));
        (Self { tx, pending }, task)
    }

    /// Queue a write. Never waits; returns false when the write was dropped.
    pub fn submit(&self, job: WriteJob) -> bool {
        let depth = self.pending.add();
        match self.tx.try_send(job) {
            Ok(()) => {
                metrics::record_queue_depth(depth);
                true
            }
            Err(err) => {
                let job = match err {
                    mpsc::error::TrySendError::Full(job) => job,
                    mpsc::error::TrySendError::Closed(job) => job,
                };
                self.pending.done();
                metrics::record_store_write(job.op(), "dropped", None);
                tracing::error!(op = job.op(), key = %job.target(), "Capture queue full, dropping write");
                false
            }
        }
    }

    /// Writes queued or in flight.
    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::Acquire)
    }

    /// Wait until every submitted write has finished.
    pub async fn flush(&self) {
        loop {
            let idle = self.pending.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Flush with a deadline. Returns false if writes were still pending.
    pub async fn drain(&self, deadline: Duration) -> bool {
        let pending = self.pending();
        if pending > 0 {
            tracing::info!(pending, "Draining capture queue");
        }
        match tokio::time::timeout(deadline, self.flush()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(pending = self.pending(), "Capture queue drain timed out");
                false
            }
        }
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<WriteJob>,
    repository: Repository,
    settings: WriterSettings,
    pending: Arc<Pending>,
) {
    let workers = Arc::new(Semaphore::new(settings.workers.max(1)));
    let lanes: Vec<mpsc::Sender<(WriteJob, PendingGuard)>> = (0..settings.workers.max(1))
        .map(|_| {
            let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
            tokio::spawn(run_lane(rx, repository.clone(), settings));
            tx
        })
        .collect();

    while let Some(job) = rx.recv().await {
        let guard = PendingGuard(Arc::clone(&pending));
        if let WriteJob::AppendIndex { index, .. } = &job {
            let lane = &lanes[lane_for(index, lanes.len())];
            if let Err(mpsc::error::SendError((job, _guard))) = lane.send((job, guard)).await {
                tracing::error!(op = job.op(), key = %job.target(), "Index lane closed, dropping write");
            }
            continue;
        }

        let Ok(permit) = Arc::clone(&workers).acquire_owned().await else {
            break;
        };
        let repository = repository.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;
            execute(&repository, &job, settings).await;
        });
    }
    tracing::debug!("Capture writer stopped");
}

/// Appends to one index key always land on the same lane, so they reach the
/// store in submission order.
fn lane_for(index: &IndexKey, lanes: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    index.hash(&mut hasher);
    (hasher.finish() % lanes.max(1) as u64) as usize
}

async fn run_lane(
    mut rx: mpsc::Receiver<(WriteJob, PendingGuard)>,
    repository: Repository,
    settings: WriterSettings,
) {
    while let Some((job, guard)) = rx.recv().await {
        execute(&repository, &job, settings).await;
        drop(guard);
    }
}

async fn execute(repository: &Repository, job: &WriteJob, settings: WriterSettings) {
    let start = Instant::now();
    let (result, attempts) = settings
        .retry
        .run(|| job.apply(repository, settings.content_ttl))
        .await;

    match result {
        Ok(()) => {
            let outcome = if attempts > 1 { "retried" } else { "ok" };
            metrics::record_store_write(job.op(), outcome, Some(start));
        }
        Err(e) => {
            metrics::record_store_write(job.op(), "failed", Some(start));
            tracing::error!(
                op = job.op(),
                key = %job.target(),
                attempts,
                error = %e,
                "Capture write failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RecorderError, Result};
    use crate::store::{ContentStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    fn settings(queue_capacity: usize) -> WriterSettings {
        WriterSettings {
            queue_capacity,
            workers: 4,
            content_ttl: Duration::from_secs(60),
            retry: RetryPolicy {
                max_attempts: 3,
                attempt_timeout: Duration::from_millis(200),
                base_delay_ms: 1,
                max_delay_ms: 5,
            },
        }
    }

    /// Fails the first `failures` writes, then delegates.
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicU32,
    }

    #[async_trait]
    impl ContentStore for FlakyStore {
        async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(RecorderError::StoreUnavailable("connection refused".into()));
            }
            self.inner.put(key, value, ttl).await
        }
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }
        async fn append(&self, key: &str, member: &str, ttl: Duration) -> Result<()> {
            self.inner.append(key, member, ttl).await
        }
        async fn range(&self, key: &str) -> Result<Vec<String>> {
            self.inner.range(key).await
        }
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        async fn close(&self) {}
    }

    fn content_job(raw: &str) -> WriteJob {
        let id = ExchangeId::parse(raw).unwrap();
        WriteJob::PutContent {
            key: ContentKey::request(&id),
            content: ExchangeContent {
                id: raw.to_string(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn flush_waits_for_writes() {
        let repo = Repository::new(Arc::new(MemoryStore::new()), "", Duration::from_secs(60));
        let (writer, _task) = CaptureWriter::spawn(repo.clone(), settings(64));

        for i in 0..20 {
            assert!(writer.submit(content_job(&format!("{}-1", i))));
        }
        writer.flush().await;
        assert_eq!(writer.pending(), 0);

        let id = ExchangeId::parse("19-1").unwrap();
        assert!(repo.get_content(&ContentKey::request(&id)).await.is_ok());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(2),
        });
        let repo = Repository::new(store, "", Duration::from_secs(60));
        let (writer, _task) = CaptureWriter::spawn(repo.clone(), settings(8));

        writer.submit(content_job("1-1"));
        writer.flush().await;

        let id = ExchangeId::parse("1-1").unwrap();
        assert_eq!(repo.get_content(&ContentKey::request(&id)).await.unwrap().id, "1-1");
    }

    #[tokio::test]
    async fn exhausted_retries_are_swallowed() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(100),
        });
        let repo = Repository::new(store, "", Duration::from_secs(60));
        let (writer, _task) = CaptureWriter::spawn(repo.clone(), settings(8));

        assert!(writer.submit(content_job("1-1")));
        assert!(writer.drain(Duration::from_secs(2)).await);

        let id = ExchangeId::parse("1-1").unwrap();
        let err = repo.get_content(&ContentKey::request(&id)).await.unwrap_err();
        assert!(matches!(err, RecorderError::NotFound(_)));
    }

    #[tokio::test]
    async fn flush_on_idle_writer_returns_immediately() {
        let repo = Repository::new(Arc::new(MemoryStore::new()), "", Duration::from_secs(60));
        let (writer, _task) = CaptureWriter::spawn(repo, settings(8));
        assert!(writer.drain(Duration::from_millis(50)).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn index_appends_keep_submission_order() {
        let repo = Repository::new(Arc::new(MemoryStore::new()), "", Duration::from_secs(60));
        let mut tuned = settings(4096);
        tuned.workers = 32;
        let (writer, _task) = CaptureWriter::spawn(repo.clone(), tuned);

        let index = IndexKey::new("X1", "example.com/a", "GET");
        let other = IndexKey::new("X2", "example.com/a", "GET");
        let mut expected = Vec::new();
        for i in 0..500 {
            let id = ExchangeId::parse(&format!("{}-1", i)).unwrap();
            assert!(writer.submit(WriteJob::AppendIndex {
                index: index.clone(),
                id: id.clone(),
            }));
            assert!(writer.submit(WriteJob::AppendIndex {
                index: other.clone(),
                id: id.clone(),
            }));
            assert!(writer.submit(content_job(&format!("{}-1", i))));
            expected.push(id);
            tokio::task::yield_now().await;
        }
        writer.flush().await;

        assert_eq!(repo.list_index(&index).await.unwrap(), expected);
        assert_eq!(repo.list_index(&other).await.unwrap(), expected);
    }

    #[test]
    fn lanes_are_stable_per_key() {
        let index = IndexKey::new("X1", "example.com/a", "GET");
        assert_eq!(lane_for(&index, 8), lane_for(&index.clone(), 8));
        assert!(lane_for(&index, 8) < 8);
        assert_eq!(lane_for(&index, 1), 0);
    }
}
