//! Storage backends for queued jobs.
//!
//! `RedisBackend` is the durable store: jobs live in a hash (`id -> json`)
//! plus a sorted set per queue scored by `notBefore` (epoch seconds), popped
//! with a small Lua script so two competing workers can never both claim the
//! same job — the same atomic-pop idiom the dark_tower Redis client uses for
//! its fenced writes. `InMemoryBackend` is the fallback named in spec §4.C:
//! always available, used either standalone (single-node mode) or as the
//! landing spot for enqueues the Redis backend rejects.

use async_trait::async_trait;
use chrono::Utc;
use meeting_types::{Job, QueueName};
use redis::aio::ConnectionManager;
use redis::Script;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::QueueError;

#[async_trait]
pub trait Backend: Send + Sync {
    async fn enqueue(&self, job: Job) -> Result<(), QueueError>;
    async fn pop_ready(&self, queue: QueueName) -> Result<Option<Job>, QueueError>;
    async fn cancel(&self, queue: QueueName, id: &str) -> Result<(), QueueError>;
}

#[derive(Clone)]
pub struct InMemoryBackend {
    queues: Arc<Mutex<HashMap<QueueName, Vec<Job>>>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().await;
        queues.entry(job.queue()).or_default().push(job);
        Ok(())
    }

    async fn pop_ready(&self, queue: QueueName) -> Result<Option<Job>, QueueError> {
        let mut queues = self.queues.lock().await;
        let Some(bucket) = queues.get_mut(&queue) else {
            return Ok(None);
        };
        let now = Utc::now();
        // FIFO within ready jobs of equal notBefore: earliest notBefore, then
        // earliest createdAt, wins (spec §3 Job: "preserves FIFO within
        // ready jobs of equal notBefore").
        let idx = bucket
            .iter()
            .enumerate()
            .filter(|(_, j)| j.not_before <= now)
            .min_by_key(|(_, j)| (j.not_before, j.created_at))
            .map(|(i, _)| i);
        Ok(idx.map(|i| bucket.remove(i)))
    }

    async fn cancel(&self, queue: QueueName, id: &str) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().await;
        if let Some(bucket) = queues.get_mut(&queue) {
            bucket.retain(|j| j.id != id);
        }
        Ok(())
    }
}

const POP_READY_SCRIPT: &str = r#"
local ids = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, 1)
if #ids == 0 then
    return false
end
local id = ids[1]
redis.call('ZREM', KEYS[1], id)
local doc = redis.call('HGET', KEYS[2], id)
redis.call('HDEL', KEYS[2], id)
return doc
"#;

#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    pop_script: Script,
}

impl RedisBackend {
    pub async fn connect(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            pop_script: Script::new(POP_READY_SCRIPT),
        })
    }

    fn ready_key(queue: QueueName) -> String {
        format!("queue:{}:ready", queue.as_str())
    }

    fn jobs_key(queue: QueueName) -> String {
        format!("queue:{}:jobs", queue.as_str())
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let queue = job.queue();
        let score = job.not_before.timestamp();
        let payload = serde_json::to_string(&job)?;
        redis::pipe()
            .atomic()
            .hset(Self::jobs_key(queue), &job.id, payload)
            .zadd(Self::ready_key(queue), &job.id, score)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn pop_ready(&self, queue: QueueName) -> Result<Option<Job>, QueueError> {
        let mut conn = self.conn.clone();
        let now = Utc::now().timestamp();
        let doc: Option<String> = self
            .pop_script
            .key(Self::ready_key(queue))
            .key(Self::jobs_key(queue))
            .arg(now)
            .invoke_async(&mut conn)
            .await?;
        match doc {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn cancel(&self, queue: QueueName, id: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .zrem(Self::ready_key(queue), id)
            .hdel(Self::jobs_key(queue), id)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meeting_types::JobPayload;

    fn sample_job(id: &str) -> Job {
        Job::immediate(
            id.to_string(),
            JobPayload::MomGeneration {
                meeting_id: "ABC-123-XYZ".into(),
                requested_by: "user-1".into(),
            },
        )
    }

    #[tokio::test]
    async fn in_memory_backend_pops_fifo_among_ready_jobs() {
        let backend = InMemoryBackend::default();
        backend.enqueue(sample_job("a")).await.unwrap();
        backend.enqueue(sample_job("b")).await.unwrap();

        let first = backend
            .pop_ready(QueueName::MomGeneration)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.id, "a");
        let second = backend
            .pop_ready(QueueName::MomGeneration)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.id, "b");
        assert!(backend
            .pop_ready(QueueName::MomGeneration)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn cancel_removes_pending_job() {
        let backend = InMemoryBackend::default();
        backend.enqueue(sample_job("a")).await.unwrap();
        backend.cancel(QueueName::MomGeneration, "a").await.unwrap();
        assert!(backend
            .pop_ready(QueueName::MomGeneration)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn not_yet_ready_jobs_are_skipped() {
        let backend = InMemoryBackend::default();
        let future_job = Job::scheduled(
            "future".into(),
            JobPayload::MomGeneration {
                meeting_id: "ABC-123-XYZ".into(),
                requested_by: "user-1".into(),
            },
            Utc::now() + chrono::Duration::hours(1),
        );
        backend.enqueue(future_job).await.unwrap();
        assert!(backend
            .pop_ready(QueueName::MomGeneration)
            .await
            .unwrap()
            .is_none());
    }
}
