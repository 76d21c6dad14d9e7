//! Worker pools, retry/backoff, and graceful shutdown (spec §4.C).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use meeting_types::{Job, QueueName};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::backend::{Backend, InMemoryBackend};
use crate::dead_letter::DeadLetterBuffer;
use crate::error::{HandlerError, QueueError};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
pub type JobHandler = Arc<dyn Fn(Job) -> BoxFuture<Result<(), HandlerError>> + Send + Sync>;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

struct Inner {
    primary: Arc<dyn Backend>,
    fallback: InMemoryBackend,
    handlers: tokio::sync::RwLock<HashMap<QueueName, JobHandler>>,
    dead_letters: DeadLetterBuffer,
    stopping: AtomicBool,
    in_flight: AtomicUsize,
}

/// The queue client shared by HTTP handlers (enqueue) and the worker runtime
/// (spawned once at startup). Clone is cheap — it's an `Arc` underneath.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

impl JobQueue {
    pub fn new(primary: Arc<dyn Backend>) -> Self {
        Self {
            inner: Arc::new(Inner {
                primary,
                fallback: InMemoryBackend::default(),
                handlers: tokio::sync::RwLock::new(HashMap::new()),
                dead_letters: DeadLetterBuffer::default(),
                stopping: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// A queue backed only by the in-memory fallback, for single-node mode
    /// or tests (spec §4.C "In-memory fallback").
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::default()))
    }

    pub async fn register<F, Fut>(&self, queue: QueueName, handler: F)
    where
        F: Fn(Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let boxed: JobHandler = Arc::new(move |job| Box::pin(handler(job)));
        self.inner.handlers.write().await.insert(queue, boxed);
    }

    /// Enqueue a job. Falls back to the in-memory backend transparently if
    /// the durable backend rejects the write (spec §4.C).
    #[tracing::instrument(skip(self, job), fields(queue = %job.queue().as_str(), job_id = %job.id))]
    pub async fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        if self.inner.stopping.load(Ordering::SeqCst) {
            return Err(QueueError::ShuttingDown);
        }
        if let Err(e) = self.inner.primary.enqueue(job.clone()).await {
            warn!(error = %e, "durable enqueue failed, falling back to in-memory queue");
            self.inner.fallback.enqueue(job).await?;
        }
        Ok(())
    }

    /// Cancel a job by deterministic ID (used for reminder cancellation,
    /// spec §4.H).
    pub async fn cancel(&self, queue: QueueName, id: &str) -> Result<(), QueueError> {
        self.inner.primary.cancel(queue, id).await?;
        self.inner.fallback.cancel(queue, id).await?;
        Ok(())
    }

    pub async fn dead_letters(&self, queue: QueueName) -> Vec<crate::dead_letter::DeadLetter> {
        self.inner.dead_letters.recent(queue).await
    }

    /// Spawn the worker pool for every registered queue. `concurrency`
    /// workers per queue poll both backends, oldest-ready-first.
    pub async fn start(&self) -> Vec<JoinHandle<()>> {
        let handlers = self.inner.handlers.read().await;
        let mut tasks = Vec::new();
        for (&queue, handler) in handlers.iter() {
            for worker_idx in 0..queue.concurrency() {
                let inner = Arc::clone(&self.inner);
                let handler = Arc::clone(handler);
                tasks.push(tokio::spawn(async move {
                    worker_loop(inner, queue, worker_idx, handler).await;
                }));
            }
        }
        tasks
    }

    /// Stop accepting new jobs, wait for in-flight jobs to finish up to
    /// `deadline`, then return (spec §4.C "Graceful shutdown").
    pub async fn shutdown(&self, deadline: Duration) {
        self.inner.stopping.store(true, Ordering::SeqCst);
        let start = tokio::time::Instant::now();
        while self.inner.in_flight.load(Ordering::SeqCst) > 0 {
            if start.elapsed() >= deadline {
                warn!("queue shutdown deadline hit with jobs still in flight");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

async fn worker_loop(inner: Arc<Inner>, queue: QueueName, worker_idx: usize, handler: JobHandler) {
    info!(queue = %queue.as_str(), worker_idx, "worker started");
    loop {
        if inner.stopping.load(Ordering::SeqCst) {
            break;
        }
        let job = match inner.primary.pop_ready(queue).await {
            Ok(Some(job)) => Some(job),
            Ok(None) => match inner.fallback.pop_ready(queue).await {
                Ok(job) => job,
                Err(e) => {
                    error!(error = %e, "fallback backend error");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "primary backend error, checking fallback");
                inner.fallback.pop_ready(queue).await.ok().flatten()
            }
        };

        let Some(job) = job else {
            tokio::time::sleep(POLL_INTERVAL).await;
            continue;
        };

        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        run_job(&inner, queue, job, &handler).await;
        inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
    info!(queue = %queue.as_str(), worker_idx, "worker stopped");
}

async fn run_job(inner: &Arc<Inner>, queue: QueueName, mut job: Job, handler: &JobHandler) {
    match handler(job.clone()).await {
        Ok(()) => {
            info!(job_id = %job.id, queue = %queue.as_str(), "job completed");
        }
        Err(err) => {
            let attempts_used = job.payload.queue().default_attempts() - job.attempts_remaining;
            job.attempts_remaining = job.attempts_remaining.saturating_sub(1);
            if err.retryable && job.attempts_remaining > 0 {
                let backoff = queue.base_backoff_secs() * 2u64.pow(attempts_used.min(6));
                job.not_before = Utc::now() + chrono::Duration::seconds(backoff as i64);
                warn!(job_id = %job.id, queue = %queue.as_str(), attempts_remaining = job.attempts_remaining, "job failed, retrying");
                if let Err(e) = inner.primary.enqueue(job.clone()).await {
                    warn!(error = %e, "retry enqueue to primary failed, using fallback");
                    let _ = inner.fallback.enqueue(job).await;
                }
            } else {
                error!(job_id = %job.id, queue = %queue.as_str(), error = %err, "job dead-lettered");
                inner.dead_letters.push(queue, job, err.to_string()).await;
            }
        }
    }
}
