// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of SimpleLock.
//
// SimpleLock is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// SimpleLock is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with SimpleLock. If not, see <https://www.gnu.org/licenses/>.

//! Redis-based lock backend.
//!
//! ## Purpose
//! Holds lock records in Redis so independent processes can coordinate.
//!
//! ## Protocol
//! - **Acquire**: `SET key token NX PX ttl_ms`; Redis never overwrites an
//!   existing key, which is the whole mutual-exclusion guarantee
//! - **Release**: Lua script, `GET` + compare + `DEL` in one server-side step
//! - **Refresh**: Lua script, `GET` + compare + `PEXPIRE` in one server-side step
//!
//! Scripts run atomically on the Redis server, so no other client can slip
//! an acquire between the ownership check and the mutation.
//!
//! ## Usage
//! ```rust,no_run
//! use simplelock_locks::{LockManager, redis::RedisLockBackend};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = RedisLockBackend::new("redis://localhost:6379").await?;
//! let manager = LockManager::new(Arc::new(backend));
//! assert!(manager.lock("orderId=42", 0).await);
//! # Ok(())
//! # }
//! ```

use crate::backend::{ttl_millis, LockBackend, LockRecord};
use crate::LockResult;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client, Script};
use std::time::Duration;

/// Delete the key only if it still holds our token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Re-arm the expiry only if the key still holds our token.
const REFRESH_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

/// Redis lock backend.
///
/// ## Architecture
/// - Uses `redis` crate with async `ConnectionManager` (automatic reconnection)
/// - Scripts are sent with `EVALSHA` and fall back to `EVAL` on a cache miss
/// - Clones share the connection manager
#[derive(Clone)]
pub struct RedisLockBackend {
    manager: ConnectionManager,
    release_script: Script,
    refresh_script: Script,
}

impl RedisLockBackend {
    /// Connect to Redis.
    ///
    /// Example URLs:
    /// - `redis://127.0.0.1/`
    /// - `rediss://host:6379/`
    pub async fn new(url: &str) -> LockResult<Self> {
        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;

        Ok(Self {
            manager,
            release_script: Script::new(RELEASE_SCRIPT),
            refresh_script: Script::new(REFRESH_SCRIPT),
        })
    }
}

#[async_trait]
impl LockBackend for RedisLockBackend {
    async fn set_if_absent(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        let ttl_ms = ttl_millis(key, ttl)?;
        let mut conn = self.manager.clone();

        // Nil reply when the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;

        Ok(reply.is_some())
    }

    async fn delete_if_owner(&self, key: &str, token: &str) -> LockResult<bool> {
        let mut conn = self.manager.clone();

        let deleted: i64 = self
            .release_script
            .key(key)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;

        Ok(deleted > 0)
    }

    async fn expire_if_owner(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        let ttl_ms = ttl_millis(key, ttl)?;
        let mut conn = self.manager.clone();

        let armed: i64 = self
            .refresh_script
            .key(key)
            .arg(token)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await?;

        Ok(armed > 0)
    }

    async fn get_record(&self, key: &str) -> LockResult<Option<LockRecord>> {
        let mut conn = self.manager.clone();

        let (owner, pttl): (Option<String>, i64) = redis::pipe()
            .atomic()
            .get(key)
            .pttl(key)
            .query_async(&mut conn)
            .await?;

        Ok(owner.map(|owner| LockRecord {
            owner,
            // -1: no expiry, -2: vanished between GET and PTTL (cannot happen in MULTI)
            ttl: (pttl >= 0).then(|| Duration::from_millis(pttl as u64)),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

// ============================================================================
// TESTS (require a running Redis instance)
// ============================================================================
