//! In-memory ring buffer of dead-lettered jobs per queue (SPEC_FULL §C),
//! so an operator can inspect what failed without a separate alerting
//! pipeline. Spec §4.F "Failure semantics" only requires logging; this is
//! additive.

use chrono::{DateTime, Utc};
use meeting_types::{Job, QueueName};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

const CAPACITY_PER_QUEUE: usize = 100;

#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub job: Job,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct DeadLetterBuffer {
    inner: Arc<Mutex<HashMap<QueueName, VecDeque<DeadLetter>>>>,
}

impl DeadLetterBuffer {
    pub async fn push(&self, queue: QueueName, job: Job, error: String) {
        let mut inner = self.inner.lock().await;
        let bucket = inner.entry(queue).or_default();
        if bucket.len() == CAPACITY_PER_QUEUE {
            bucket.pop_front();
        }
        bucket.push_back(DeadLetter {
            job,
            error,
            failed_at: Utc::now(),
        });
    }

    pub async fn recent(&self, queue: QueueName) -> Vec<DeadLetter> {
        let inner = self.inner.lock().await;
        inner
            .get(&queue)
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }
}
