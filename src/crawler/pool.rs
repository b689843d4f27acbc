//! Bounded worker pool for fetch jobs
//!
//! A fixed number of tokio tasks drain one bounded job queue. Discovery code
//! submits jobs and suspends while the queue is full, which keeps at most
//! `queue_capacity` unconsumed jobs in flight beyond the busy workers.
//!
//! Closing the pool is tied to ownership: `shutdown` consumes the pool, drops
//! the only sender, lets the workers drain whatever is still queued and joins
//! them. Submitting after close is therefore impossible.

use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::{CanvassError, FetchError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinSet;

/// Result delivered to the submitter of a tracked job
pub type JobResult = Result<FetchOutcome, FetchError>;

/// A unit of fetch work
#[derive(Debug)]
pub struct Job {
    /// Local file the document is written to
    pub destination: PathBuf,

    /// Remote path appended to the fetcher's base URL
    pub remote_path: String,

    /// Completion channel for tracked jobs
    done: Option<oneshot::Sender<JobResult>>,
}

impl Job {
    pub fn new(destination: impl Into<PathBuf>, remote_path: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            remote_path: remote_path.into(),
            done: None,
        }
    }
}

/// Counters reported by the pool once it has drained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Documents downloaded
    pub downloaded: u64,

    /// Jobs skipped because the destination already existed
    pub already_present: u64,

    /// Jobs that failed (logged and abandoned)
    pub failed: u64,

    /// Total bytes written
    pub bytes: u64,
}

impl PoolReport {
    /// Total number of jobs processed
    pub fn jobs(&self) -> u64 {
        self.downloaded + self.already_present + self.failed
    }

    pub(crate) fn record(&mut self, result: &JobResult) {
        match result {
            Ok(FetchOutcome::Downloaded { bytes }) => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            Ok(FetchOutcome::AlreadyPresent) => self.already_present += 1,
            Err(_) => self.failed += 1,
        }
    }

    fn merge(&mut self, other: PoolReport) {
        self.downloaded += other.downloaded;
        self.already_present += other.already_present;
        self.failed += other.failed;
        self.bytes += other.bytes;
    }
}

/// Fixed-size pool of fetch workers sharing one job queue
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    workers: JoinSet<PoolReport>,
}

impl WorkerPool {
    /// Starts `size` workers fed by a queue holding `queue_capacity` jobs
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(fetcher: Arc<Fetcher>, size: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = JoinSet::new();
        for worker_id in 0..size.max(1) {
            let fetcher = Arc::clone(&fetcher);
            let receiver = Arc::clone(&receiver);
            workers.spawn(run_worker(worker_id, fetcher, receiver));
        }

        tracing::debug!("Started worker pool with {} workers", size.max(1));

        Self { sender, workers }
    }

    /// Queues a job, waiting while the queue is full
    pub async fn submit(&self, job: Job) -> Result<(), CanvassError> {
        self.sender
            .send(job)
            .await
            .map_err(|_| CanvassError::PoolClosed)
    }

    /// Queues a job and returns a receiver resolving once it has been processed
    pub async fn submit_tracked(
        &self,
        mut job: Job,
    ) -> Result<oneshot::Receiver<JobResult>, CanvassError> {
        let (done, receiver) = oneshot::channel();
        job.done = Some(done);
        self.submit(job).await?;
        Ok(receiver)
    }

    /// Closes the queue, waits for every queued job and joins the workers
    pub async fn shutdown(self) -> PoolReport {
        let WorkerPool {
            sender,
            mut workers,
        } = self;
        drop(sender);

        let mut report = PoolReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_report) => report.merge(worker_report),
                Err(e) => tracing::error!("Fetch worker terminated abnormally: {}", e),
            }
        }

        report
    }
}

/// Worker loop: take a job, fetch it, log failures, repeat until the queue closes
async fn run_worker(
    worker_id: usize,
    fetcher: Arc<Fetcher>,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
) -> PoolReport {
    let mut report = PoolReport::default();

    loop {
        // The lock is released before the fetch so other workers can dequeue
        let next = receiver.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };

        let result = fetcher.ensure(&job.destination, &job.remote_path).await;
        if let Err(e) = &result {
            tracing::warn!("{}", e);
        }
        report.record(&result);

        if let Some(done) = job.done {
            // The submitter may have stopped waiting; nothing to do then
            let _ = done.send(result);
        }
    }

    tracing::trace!("Worker {} exiting: {:?}", worker_id, report);
    report
}
