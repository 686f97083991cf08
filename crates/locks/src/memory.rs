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

//! In-memory lock backend (for testing and single-process use).

use crate::backend::{ttl_millis, LockBackend, LockRecord};
use crate::LockResult;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct MemoryEntry {
    owner: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory lock backend.
///
/// ## Purpose
/// Emulates the store semantics the lock protocol relies on (conditional
/// set with expiry, owner-checked delete and expire) inside one process.
/// Clones share the same map, so several [`crate::LockManager`]s built on
/// clones of one backend behave like separate processes sharing one store.
///
/// ## Limitations
/// - Not persistent (locks lost on restart)
/// - Not distributed (single process only)
/// - Lazy expiry: an expired entry is treated as absent and dropped on access
///
/// Time is read from `tokio::time::Instant`, so a paused tokio clock drives
/// expiry deterministically in tests.
#[derive(Clone, Default)]
pub struct MemoryLockBackend {
    entries: Arc<DashMap<String, MemoryEntry>>,
}

impl MemoryLockBackend {
    /// Create a new, empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) lock records.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    /// True when no live lock record exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired records, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_live(now));
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    async fn set_if_absent(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        ttl_millis(key, ttl)?;
        let now = Instant::now();
        let fresh = MemoryEntry {
            owner: token.to_string(),
            expires_at: now + ttl,
        };

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    Ok(false)
                } else {
                    occupied.insert(fresh);
                    Ok(true)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn delete_if_owner(&self, key: &str, token: &str) -> LockResult<bool> {
        let now = Instant::now();
        let removed = self
            .entries
            .remove_if(key, |_, e| e.is_live(now) && e.owner == token);
        if removed.is_some() {
            return Ok(true);
        }
        self.entries.remove_if(key, |_, e| !e.is_live(now));
        Ok(false)
    }

    async fn expire_if_owner(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        ttl_millis(key, ttl)?;
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.is_live(now) && entry.owner == token => {
                entry.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_record(&self, key: &str) -> LockResult<Option<LockRecord>> {
        let now = Instant::now();
        let record = self.entries.get(key).and_then(|e| {
            e.is_live(now).then(|| LockRecord {
                owner: e.owner.clone(),
                ttl: Some(e.expires_at.duration_since(now)),
            })
        });
        if record.is_none() {
            // Ref above is released; safe to touch the shard again.
            self.entries.remove_if(key, |_, e| !e.is_live(now));
        }
        Ok(record)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LockError;

    const TTL: Duration = Duration::from_secs(600);

    #[tokio::test]
    async fn test_set_if_absent() {
        let backend = MemoryLockBackend::new();
        assert!(backend.set_if_absent("lock:a", "node-1", TTL).await.unwrap());

        let record = backend.get_record("lock:a").await.unwrap().unwrap();
        assert_eq!(record.owner, "node-1");
        assert!(record.ttl.unwrap() <= TTL);
    }

    #[tokio::test]
    async fn test_set_if_absent_never_overwrites() {
        let backend = MemoryLockBackend::new();
        assert!(backend.set_if_absent("lock:a", "node-1", TTL).await.unwrap());
        assert!(!backend.set_if_absent("lock:a", "node-2", TTL).await.unwrap());
        // Same owner does not re-acquire either
        assert!(!backend.set_if_absent("lock:a", "node-1", TTL).await.unwrap());

        let record = backend.get_record("lock:a").await.unwrap().unwrap();
        assert_eq!(record.owner, "node-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_record_can_be_reacquired() {
        let backend = MemoryLockBackend::new();
        backend
            .set_if_absent("lock:a", "node-1", Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(backend.get_record("lock:a").await.unwrap().is_none());
        assert!(backend.set_if_absent("lock:a", "node-2", TTL).await.unwrap());
        let record = backend.get_record("lock:a").await.unwrap().unwrap();
        assert_eq!(record.owner, "node-2");
    }

    #[tokio::test]
    async fn test_delete_if_owner() {
        let backend = MemoryLockBackend::new();
        backend.set_if_absent("lock:a", "node-1", TTL).await.unwrap();

        assert!(!backend.delete_if_owner("lock:a", "node-2").await.unwrap());
        assert!(backend.get_record("lock:a").await.unwrap().is_some());

        assert!(backend.delete_if_owner("lock:a", "node-1").await.unwrap());
        assert!(backend.get_record("lock:a").await.unwrap().is_none());

        // Second delete finds nothing
        assert!(!backend.delete_if_owner("lock:a", "node-1").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_if_owner() {
        let backend = MemoryLockBackend::new();
        backend
            .set_if_absent("lock:a", "node-1", Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        // Non-owner leaves the TTL alone
        assert!(!backend
            .expire_if_owner("lock:a", "node-2", Duration::from_secs(600))
            .await
            .unwrap());
        let record = backend.get_record("lock:a").await.unwrap().unwrap();
        assert_eq!(record.ttl, Some(Duration::from_secs(30)));

        // Owner re-arms it without changing the value
        assert!(backend
            .expire_if_owner("lock:a", "node-1", Duration::from_secs(600))
            .await
            .unwrap());
        let record = backend.get_record("lock:a").await.unwrap().unwrap();
        assert_eq!(record.owner, "node-1");
        assert_eq!(record.ttl, Some(Duration::from_secs(600)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_if_owner_on_expired_record() {
        let backend = MemoryLockBackend::new();
        backend
            .set_if_absent("lock:a", "node-1", Duration::from_secs(5))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(!backend
            .expire_if_owner("lock:a", "node-1", TTL)
            .await
            .unwrap());
        assert_eq!(backend.purge_expired(), 1);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let backend = MemoryLockBackend::new();
        let result = backend.set_if_absent("lock:a", "node-1", Duration::ZERO).await;
        assert!(matches!(result, Err(LockError::InvalidTtl { .. })));
        assert!(backend.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_set_if_absent() {
        let backend = MemoryLockBackend::new();
        let mut handles = vec![];

        for i in 0..16 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend
                    .set_if_absent("lock:contended", &format!("node-{}", i), TTL)
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(backend.len(), 1);
    }
}
