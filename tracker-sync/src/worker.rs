//! Worker pool draining the dispatcher's job queue.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use tracker_core::types::{Job, JobKind};

use crate::error::SyncError;

/// Performs the side effect of one job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), SyncError>;
}

/// Logs jobs without applying them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunHandler;

#[async_trait]
impl JobHandler for DryRunHandler {
    async fn handle(&self, job: &Job) -> Result<(), SyncError> {
        tracing::info!(
            repo = %job.repository.name,
            kind = %job.kind,
            package = %job.key(),
            "[dry-run] would apply",
        );
        Ok(())
    }
}

/// Counters for one pool run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub registered: usize,
    pub unregistered: usize,
    pub logos_requested: usize,
    pub failed: usize,
}

impl WorkerReport {
    fn record(&mut self, job: &Job) {
        match job.kind {
            JobKind::Register => self.registered += 1,
            JobKind::Unregister => self.unregistered += 1,
        }
        if job.fetch_logo {
            self.logos_requested += 1;
        }
    }

    fn merge(&mut self, other: WorkerReport) {
        self.registered += other.registered;
        self.unregistered += other.unregistered;
        self.logos_requested += other.logos_requested;
        self.failed += other.failed;
    }

    pub fn processed(&self) -> usize {
        self.registered + self.unregistered
    }
}

/// Fixed number of workers sharing one receiver.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Drain `queue` until it is closed.
    ///
    /// Handler failures are logged and counted; they never stop the pool.
    pub async fn run(
        &self,
        queue: mpsc::Receiver<Job>,
        handler: Arc<dyn JobHandler>,
    ) -> Result<WorkerReport, SyncError> {
        let queue = Arc::new(Mutex::new(queue));
        let mut workers = JoinSet::new();
        for worker in 0..self.workers {
            let queue = queue.clone();
            let handler = handler.clone();
            workers.spawn(async move { work(worker, queue, handler).await });
        }

        let mut report = WorkerReport::default();
        while let Some(joined) = workers.join_next().await {
            let partial = joined.map_err(|err| SyncError::Join(err.to_string()))?;
            report.merge(partial);
        }
        tracing::info!(
            registered = report.registered,
            unregistered = report.unregistered,
            failed = report.failed,
            "worker pool drained",
        );
        Ok(report)
    }
}

async fn work(
    worker: usize,
    queue: Arc<Mutex<mpsc::Receiver<Job>>>,
    handler: Arc<dyn JobHandler>,
) -> WorkerReport {
    let mut report = WorkerReport::default();
    loop {
        let next = queue.lock().await.recv().await;
        let Some(job) = next else { break };
        match handler.handle(&job).await {
            Ok(()) => report.record(&job),
            Err(err) => {
                tracing::error!(
                    worker,
                    repo = %job.repository.name,
                    kind = %job.kind,
                    package = %job.key(),
                    error = %err,
                    "job failed",
                );
                report.failed += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracker_core::types::PackageKey;

    use super::*;
    use crate::testing::{repository, version};

    #[derive(Default)]
    struct Counting {
        seen: AtomicUsize,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl JobHandler for Counting {
        async fn handle(&self, job: &Job) -> Result<(), SyncError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.as_deref() == Some(job.package.name.as_str()) {
                return Err(SyncError::Http {
                    url: job.repository.url.clone(),
                    message: "catalog service unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn drains_until_queue_closes() {
        let repo = repository("r1");
        let (tx, rx) = mpsc::channel(2);
        let handler = Arc::new(Counting::default());
        let pool = WorkerPool::new(3);
        let running = tokio::spawn({
            let handler: Arc<dyn JobHandler> = handler.clone();
            async move { pool.run(rx, handler).await }
        });

        for i in 0..10 {
            let job = Job::register(repo.clone(), version("a", &format!("1.0.{i}"), "d"), i == 0);
            tx.send(job).await.expect("send");
        }
        tx.send(Job::unregister(repo.clone(), PackageKey::new("b", "1.0.0")))
            .await
            .expect("send");
        drop(tx);

        let report = running.await.expect("join").expect("pool");
        assert_eq!(report.registered, 10);
        assert_eq!(report.unregistered, 1);
        assert_eq!(report.logos_requested, 1);
        assert_eq!(report.processed(), 11);
        assert_eq!(handler.seen.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn handler_failures_are_counted_not_fatal() {
        let repo = repository("r1");
        let (tx, rx) = mpsc::channel(8);
        tx.send(Job::register(repo.clone(), version("bad", "1.0.0", "d"), true))
            .await
            .unwrap();
        tx.send(Job::register(repo.clone(), version("good", "1.0.0", "d"), true))
            .await
            .unwrap();
        drop(tx);

        let handler = Arc::new(Counting {
            fail_on: Some("bad".to_string()),
            ..Counting::default()
        });
        let report = WorkerPool::new(1).run(rx, handler).await.expect("pool");
        assert_eq!(report.failed, 1);
        assert_eq!(report.registered, 1);
    }

    #[tokio::test]
    async fn zero_workers_is_clamped_to_one() {
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        let report = WorkerPool::new(0)
            .run(rx, Arc::new(DryRunHandler))
            .await
            .expect("pool");
        assert_eq!(report, WorkerReport::default());
    }
}
