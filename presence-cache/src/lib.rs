//! Cache / presence store (spec §4.B).
//!
//! Grounded on the fenced Redis client pattern used for meeting coordination
//! in the dark_tower controller: a cheaply-cloneable async connection held
//! behind a small struct, one `#[instrument]`-annotated method per
//! operation, errors logged with the key/meeting fields attached rather than
//! bubbled up as a hard failure. The difference from that client is the
//! degradation policy spec §4.B asks for: every read/write here treats a
//! Redis outage as "unknown" rather than retrying or fencing, because a
//! cache outage must never block signaling.

pub mod error;
pub mod rate_limit;

pub use error::CacheError;
pub use rate_limit::RateLimitResult;

use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use tracing::{instrument, warn};

const ONLINE_TTL_SECS: i64 = 60 * 60;

#[derive(Clone)]
pub struct PresenceCache {
    conn: ConnectionManager,
}

impl PresenceCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url).map_err(CacheError::Connect)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(CacheError::Connect)?;
        Ok(Self { conn })
    }

    #[instrument(skip(self, value), fields(key = %key))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: i64) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value).unwrap_or_default();
        let mut conn = self.conn.clone();
        if ttl_seconds > 0 {
            conn.set_ex::<_, _, ()>(key, payload, ttl_seconds as u64)
                .await?;
        } else {
            conn.set::<_, _, ()>(key, payload).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "presence cache get failed, treating as unknown");
                None
            }
        }
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    /// Delete every key matching a glob pattern. Uses `SCAN` rather than
    /// `KEYS` so a large keyspace doesn't block the server.
    #[instrument(skip(self), fields(pattern = %pattern))]
    pub async fn del_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        let mut cursor = 0u64;
        let mut deleted = 0u64;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                deleted += conn.del::<_, u64>(keys).await?;
            }
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(deleted)
    }

    #[instrument(skip(self, value), fields(key = %key, field = %field))]
    pub async fn hset<T: Serialize>(&self, key: &str, field: &str, value: &T) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value).unwrap_or_default();
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(key, field, payload).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key, field = %field))]
    pub async fn hdel(&self, key: &str, field: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.hdel::<_, _, ()>(key, field).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn hget_all(&self, key: &str) -> HashMap<String, String> {
        let mut conn = self.conn.clone();
        match conn.hgetall::<_, HashMap<String, String>>(key).await {
            Ok(map) => map,
            Err(e) => {
                warn!(key = %key, error = %e, "presence cache hgetall failed, treating as empty");
                HashMap::new()
            }
        }
    }

    fn online_key(meeting_id: &str) -> String {
        format!("meeting:{meeting_id}:online")
    }

    /// Record a user as online in a meeting with a 1-hour rolling TTL
    /// (spec §4.B `addOnlineUser`).
    #[instrument(skip(self), fields(meeting_id = %meeting_id, user_id = %user_id))]
    pub async fn add_online_user(
        &self,
        meeting_id: &str,
        user_id: &str,
        socket_id: &str,
    ) -> Result<(), CacheError> {
        let key = Self::online_key(meeting_id);
        let mut conn = self.conn.clone();
        let entry = OnlineEntry {
            socket_id: socket_id.to_string(),
            since: Utc::now(),
        };
        let payload = serde_json::to_string(&entry).unwrap_or_default();
        conn.hset::<_, _, _, ()>(&key, user_id, payload).await?;
        conn.expire::<_, ()>(&key, ONLINE_TTL_SECS).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(meeting_id = %meeting_id, user_id = %user_id))]
    pub async fn remove_online_user(&self, meeting_id: &str, user_id: &str) -> Result<(), CacheError> {
        let key = Self::online_key(meeting_id);
        let mut conn = self.conn.clone();
        conn.hdel::<_, _, ()>(&key, user_id).await?;
        Ok(())
    }

    /// Current online set for a meeting. Returns empty on a cache outage —
    /// callers fall back to the in-memory room membership (spec §4.B, §8
    /// scenario 6 "Degradation").
    #[instrument(skip(self), fields(meeting_id = %meeting_id))]
    pub async fn get_online_users(&self, meeting_id: &str) -> HashMap<String, String> {
        self.hget_all(&Self::online_key(meeting_id)).await
    }

    /// Atomic fixed-window rate limiter (spec §4.B `checkRateLimit`).
    /// Degrades to "allow" on a backend error so a cache outage cannot
    /// block the request path it's protecting.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn check_rate_limit(&self, key: &str, limit: u64, window_seconds: i64) -> RateLimitResult {
        match rate_limit::check(&self.conn, key, limit, window_seconds).await {
            Ok(result) => result,
            Err(e) => {
                warn!(key = %key, error = %e, "rate limit check failed, defaulting to allow");
                RateLimitResult {
                    allowed: true,
                    remaining: limit,
                    reset_in_seconds: window_seconds,
                }
            }
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct OnlineEntry {
    socket_id: String,
    since: chrono::DateTime<Utc>,
}
