//! Fixed-window rate limiting, atomic increment + first-hit expiry via a
//! single Lua script so the check-then-set has no race window (same
//! technique as the fencing scripts in the dark_tower Redis client).

use redis::aio::ConnectionManager;
use redis::Script;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u64,
    pub reset_in_seconds: i64,
}

/// Increments `key`, setting its expiry to `window_seconds` only on the
/// first increment of a window. Returns the post-increment count.
const INCR_WITH_WINDOW: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('TTL', KEYS[1])
return {current, ttl}
"#;

pub async fn check(
    conn: &ConnectionManager,
    key: &str,
    limit: u64,
    window_seconds: i64,
) -> Result<RateLimitResult, redis::RedisError> {
    let mut conn = conn.clone();
    let script = Script::new(INCR_WITH_WINDOW);
    let (count, ttl): (u64, i64) = script
        .key(key)
        .arg(window_seconds)
        .invoke_async(&mut conn)
        .await?;

    Ok(RateLimitResult {
        allowed: count <= limit,
        remaining: limit.saturating_sub(count),
        reset_in_seconds: if ttl > 0 { ttl } else { window_seconds },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_saturates_at_zero_over_limit() {
        let result = RateLimitResult {
            allowed: false,
            remaining: 0,
            reset_in_seconds: 30,
        };
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }
}
