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

//! Resource-oriented lock manager with automatic refresh.
//!
//! ## Two entry points
//! - **Simple** (`simple_lock` / `simple_unlock`): one store TTL, no local
//!   bookkeeping. The lock lives exactly as long as the TTL unless released.
//! - **Managed** (`lock` / `unlock`): the store key gets the short safety TTL
//!   and a local hold deadline is tracked. [`LockManager::refresh_sweep`]
//!   keeps re-arming the safety TTL until the deadline passes, so a live
//!   holder keeps its lock while a crashed one loses it within one safety TTL.
//!
//! ## State per managed key
//! `UNLOCKED -> lock -> HELD -> sweep refresh (repeatable) -> HELD ->
//! unlock, or deadline passed and store TTL lapses -> UNLOCKED`
//!
//! The tracking map only decides what *this* manager keeps refreshing; the
//! store is the sole arbiter of ownership.

use crate::backend::{LockBackend, LockRecord};
use crate::config::LockSettings;
use crate::identity::generate_node_id;
use crate::key::{is_blank, LockKeySpace};
use crate::refresher::LockRefresher;
use crate::store::LockStore;
use crate::LockResult;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Outcome of one refresh sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Store keys whose safety TTL was re-armed
    pub refreshed: usize,
    /// Tracking entries dropped because their hold deadline passed
    pub expired: usize,
    /// Refresh calls that did not take effect (not owner, absent, or error)
    pub failed: usize,
}

/// Lock manager bound to one node identity.
///
/// ## Example
/// ```rust
/// # #[cfg(feature = "memory-backend")]
/// use simplelock_locks::{LockManager, memory::MemoryLockBackend};
/// use std::sync::Arc;
///
/// # #[cfg(feature = "memory-backend")]
/// # async fn example() {
/// let manager = LockManager::new(Arc::new(MemoryLockBackend::new()));
/// if manager.lock("orderId=42", 0).await {
///     // ... critical section ...
///     manager.unlock("orderId=42").await;
/// }
/// # }
/// ```
pub struct LockManager {
    store: LockStore,
    keys: LockKeySpace,
    settings: LockSettings,
    /// Store key -> hold deadline, managed locks only
    tracked: DashMap<String, Instant>,
}

impl LockManager {
    /// Create a manager with default settings and a fresh node identity.
    pub fn new(backend: Arc<dyn LockBackend>) -> Self {
        Self::with_settings(backend, LockSettings::default())
    }

    /// Create a manager with explicit settings and a fresh node identity.
    pub fn with_settings(backend: Arc<dyn LockBackend>, settings: LockSettings) -> Self {
        Self::with_node_id(backend, settings, generate_node_id())
    }

    /// Create a manager with an explicit node identity.
    pub fn with_node_id(
        backend: Arc<dyn LockBackend>,
        settings: LockSettings,
        node_id: impl Into<String>,
    ) -> Self {
        let store = LockStore::new(backend, node_id);
        info!(
            node_id = %store.node_id(),
            backend = store.backend().backend_name(),
            key_prefix = %settings.key_prefix,
            "lock manager created"
        );
        Self {
            store,
            keys: LockKeySpace::new(settings.key_prefix.clone()),
            settings,
            tracked: DashMap::new(),
        }
    }

    pub fn node_id(&self) -> &str {
        self.store.node_id()
    }

    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    pub fn key_space(&self) -> &LockKeySpace {
        &self.keys
    }

    /// Acquire a self-managed lock whose store TTL is `max_timeout_secs`.
    ///
    /// A non-positive timeout means the default simple timeout (600s).
    /// Nothing is tracked locally: the caller unlocks before the TTL runs out
    /// or lets it lapse.
    pub async fn simple_lock(&self, resource: &str, max_timeout_secs: i64) -> bool {
        if is_blank(resource) {
            warn!("simple_lock called with blank resource");
            return false;
        }

        let ttl = positive_secs(max_timeout_secs).unwrap_or(self.settings.default_simple_timeout);
        let key = self.keys.key_for(resource);
        info!(key = %key, ttl_secs = ttl.as_secs(), "simple lock");

        let acquired = self.store.acquire(&key, ttl).await;
        if !acquired {
            error!(key = %key, "simple lock not acquired");
        }
        info!(key = %key, acquired, "simple lock finished");
        acquired
    }

    /// Release a lock taken with [`LockManager::simple_lock`].
    pub async fn simple_unlock(&self, resource: &str) -> bool {
        if is_blank(resource) {
            warn!("simple_unlock called with blank resource");
            return false;
        }

        let key = self.keys.key_for(resource);
        info!(key = %key, "simple unlock");

        let released = self.store.release(&key).await;
        if !released {
            error!(key = %key, "simple unlock did not release");
        }
        released
    }

    /// Acquire a managed lock that is kept alive for up to `max_hold_secs`.
    ///
    /// The store key gets the safety TTL; on success a tracking entry with
    /// deadline `now + max_hold` is recorded so the sweep keeps refreshing it.
    /// A non-positive hold means the default maximum hold (6000s). A second
    /// `lock` on a held key fails without touching the holder's state.
    pub async fn lock(&self, resource: &str, max_hold_secs: i64) -> bool {
        if is_blank(resource) {
            warn!("lock called with blank resource");
            return false;
        }

        let max_hold = positive_secs(max_hold_secs).unwrap_or(self.settings.default_max_hold);
        let key = self.keys.key_for(resource);
        info!(key = %key, max_hold_secs = max_hold.as_secs(), "lock");

        // Deadline must be representable before the store key is taken.
        let Some(deadline) = Instant::now().checked_add(max_hold) else {
            warn!(key = %key, max_hold_secs = max_hold.as_secs(), "hold deadline out of range");
            return false;
        };

        let acquired = self.store.acquire(&key, self.settings.safety_ttl).await;
        if acquired {
            self.tracked.insert(key.clone(), deadline);
            metrics::gauge!("simplelock_tracked_locks").set(self.tracked.len() as f64);
        } else {
            error!(key = %key, "lock not acquired");
        }

        info!(key = %key, acquired, "lock finished");
        acquired
    }

    /// Release a managed lock.
    ///
    /// The tracking entry is dropped before the store release, so a sweep
    /// running concurrently cannot re-arm a key we are about to delete.
    /// Returns `false` if this node did not hold the key (including a second
    /// unlock of the same resource).
    pub async fn unlock(&self, resource: &str) -> bool {
        if is_blank(resource) {
            warn!("unlock called with blank resource");
            return false;
        }

        let key = self.keys.key_for(resource);
        info!(key = %key, "unlock");

        self.tracked.remove(&key);
        metrics::gauge!("simplelock_tracked_locks").set(self.tracked.len() as f64);

        let released = self.store.release(&key).await;
        if !released {
            error!(key = %key, "unlock did not release");
        }
        released
    }

    /// Refresh every tracked lock once.
    ///
    /// Entries past their hold deadline are dropped from tracking and get one
    /// final refresh in the same pass; after that nothing extends them and
    /// the store TTL drains on its own. All other entries have their store
    /// TTL reset to the safety TTL. Failed refreshes keep their entry: the
    /// failure may be transient, and the deadline bounds the retries anyway.
    pub async fn refresh_sweep(&self) -> SweepReport {
        let started = std::time::Instant::now();
        let now = Instant::now();
        let mut report = SweepReport::default();

        // Snapshot first; no map guard may be held across a store call.
        let snapshot: Vec<(String, Instant)> = self
            .tracked
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        for (key, deadline) in snapshot {
            self.sweep_entry(&key, deadline, now, &mut report).await;
        }

        metrics::gauge!("simplelock_tracked_locks").set(self.tracked.len() as f64);
        metrics::histogram!("simplelock_sweep_duration_seconds").record(started.elapsed().as_secs_f64());
        debug!(
            refreshed = report.refreshed,
            expired = report.expired,
            failed = report.failed,
            "refresh sweep finished"
        );
        report
    }

    /// Handle one snapshot entry. The tracking map may have changed since
    /// the snapshot: an entry that was unlocked, or replaced by a re-lock,
    /// is left alone.
    async fn sweep_entry(&self, key: &str, deadline: Instant, now: Instant, report: &mut SweepReport) {
        if deadline < now {
            // Only drop the entry we looked at; a re-lock may have replaced it.
            if self
                .tracked
                .remove_if(key, |_, current| *current == deadline)
                .is_none()
            {
                return;
            }
            report.expired += 1;
            debug!(
                resource = self.keys.resource_of(key).unwrap_or(key),
                "hold deadline passed, giving up refresh"
            );
        } else if !self.tracked.contains_key(key) {
            // Unlocked since the snapshot
            return;
        }

        if self.store.refresh(key, self.settings.safety_ttl).await {
            report.refreshed += 1;
        } else {
            report.failed += 1;
            warn!(
                resource = self.keys.resource_of(key).unwrap_or(key),
                "lock refresh did not take effect"
            );
        }
    }

    /// Start a background task that runs [`LockManager::refresh_sweep`]
    /// every `settings.refresh_interval`.
    pub fn spawn_refresher(self: &Arc<Self>) -> LockRefresher {
        LockRefresher::start(Arc::clone(self), self.settings.refresh_interval)
    }

    /// True if `resource` has a tracking entry (managed and not yet past its deadline sweep).
    pub fn is_tracked(&self, resource: &str) -> bool {
        self.tracked.contains_key(&self.keys.key_for(resource))
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Hold deadline of a managed lock, if tracked.
    pub fn hold_deadline(&self, resource: &str) -> Option<Instant> {
        self.tracked
            .get(&self.keys.key_for(resource))
            .map(|deadline| *deadline)
    }

    /// Current store record for `resource` (diagnostic).
    pub async fn holder(&self, resource: &str) -> LockResult<Option<LockRecord>> {
        self.store.holder(&self.keys.key_for(resource)).await
    }
}

fn positive_secs(secs: i64) -> Option<Duration> {
    u64::try_from(secs)
        .ok()
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
}

#[cfg(all(test, feature = "memory-backend"))]
mod tests {
    use super::*;
    use crate::memory::MemoryLockBackend;

    fn manager() -> (LockManager, MemoryLockBackend) {
        let backend = MemoryLockBackend::new();
        (LockManager::new(Arc::new(backend.clone())), backend)
    }

    #[test]
    fn test_positive_secs() {
        assert_eq!(positive_secs(0), None);
        assert_eq!(positive_secs(-5), None);
        assert_eq!(positive_secs(100), Some(Duration::from_secs(100)));
    }

    #[tokio::test]
    async fn test_simple_lock_uses_prefixed_key() {
        let (manager, backend) = manager();
        assert!(manager.simple_lock("orderId=42", 30).await);

        let record = backend.get_record("lock:orderId=42").await.unwrap().unwrap();
        assert_eq!(record.owner, manager.node_id());
        assert!(!manager.is_tracked("orderId=42"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simple_lock_default_timeout() {
        let (manager, _) = manager();
        assert!(manager.simple_lock("a", 0).await);
        assert!(manager.simple_lock("b", -1).await);
        assert!(manager.simple_lock("c", 600).await);

        for resource in ["a", "b", "c"] {
            let ttl = manager.holder(resource).await.unwrap().unwrap().ttl;
            assert_eq!(ttl, Some(Duration::from_secs(600)));
        }
    }

    #[tokio::test]
    async fn test_simple_unlock() {
        let (manager, backend) = manager();
        manager.simple_lock("r", 0).await;

        assert!(manager.simple_unlock("r").await);
        assert!(backend.is_empty());
        assert!(!manager.simple_unlock("r").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_tracks_deadline_and_uses_safety_ttl() {
        let (manager, _) = manager();
        let before = Instant::now();
        assert!(manager.lock("R", 100).await);

        assert!(manager.is_tracked("R"));
        assert_eq!(manager.hold_deadline("R"), Some(before + Duration::from_secs(100)));
        let record = manager.holder("R").await.unwrap().unwrap();
        assert_eq!(record.ttl, Some(Duration::from_secs(600)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_default_max_hold() {
        let (manager, _) = manager();
        let before = Instant::now();
        assert!(manager.lock("a", 0).await);
        assert!(manager.lock("b", -30).await);

        let expected = Some(before + Duration::from_secs(6000));
        assert_eq!(manager.hold_deadline("a"), expected);
        assert_eq!(manager.hold_deadline("b"), expected);
    }

    #[tokio::test]
    async fn test_failed_lock_is_not_tracked() {
        let backend: Arc<dyn LockBackend> = Arc::new(MemoryLockBackend::new());
        let a = LockManager::new(backend.clone());
        let b = LockManager::new(backend);

        assert!(a.lock("R", 0).await);
        assert!(!b.lock("R", 0).await);
        assert!(!b.is_tracked("R"));
        assert_eq!(a.holder("R").await.unwrap().unwrap().owner, a.node_id());
    }

    #[tokio::test]
    async fn test_unlock_removes_entry_and_key() {
        let (manager, backend) = manager();
        manager.lock("R", 0).await;

        assert!(manager.unlock("R").await);
        assert!(!manager.is_tracked("R"));
        assert!(backend.is_empty());

        // Idempotent: second unlock reports false, no panic
        assert!(!manager.unlock("R").await);
    }

    #[tokio::test]
    async fn test_blank_resources_short_circuit() {
        let (manager, backend) = manager();
        assert!(!manager.simple_lock("", 10).await);
        assert!(!manager.lock("   ", 10).await);
        assert!(!manager.unlock("").await);
        assert!(!manager.simple_unlock("\t").await);
        assert!(backend.is_empty());
        assert_eq!(manager.tracked_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_refreshes_live_entries() {
        let (manager, _) = manager();
        manager.lock("R", 1000).await;

        tokio::time::advance(Duration::from_secs(50)).await;
        let report = manager.refresh_sweep().await;

        assert_eq!(report, SweepReport { refreshed: 1, expired: 0, failed: 0 });
        let ttl = manager.holder("R").await.unwrap().unwrap().ttl;
        assert_eq!(ttl, Some(Duration::from_secs(600)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_gives_expired_entry_one_final_refresh() {
        let (manager, _) = manager();
        manager.lock("R", 100).await;

        tokio::time::advance(Duration::from_secs(150)).await;
        let report = manager.refresh_sweep().await;
        assert_eq!(report, SweepReport { refreshed: 1, expired: 1, failed: 0 });
        assert!(!manager.is_tracked("R"));
        let ttl = manager.holder("R").await.unwrap().unwrap().ttl;
        assert_eq!(ttl, Some(Duration::from_secs(600)));

        // Nothing left to refresh
        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(manager.refresh_sweep().await, SweepReport::default());
        let ttl = manager.holder("R").await.unwrap().unwrap().ttl;
        assert_eq!(ttl, Some(Duration::from_secs(550)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_counts_lost_locks_as_failed() {
        let backend = MemoryLockBackend::new();
        let manager = LockManager::new(Arc::new(backend.clone()));
        manager.lock("R", 0).await;

        // Store key vanished behind our back (e.g. store flushed)
        backend
            .delete_if_owner("lock:R", manager.node_id())
            .await
            .unwrap();

        let report = manager.refresh_sweep().await;
        assert_eq!(report, SweepReport { refreshed: 0, expired: 0, failed: 1 });
        assert!(manager.is_tracked("R"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_with_unrepresentable_hold_takes_nothing() {
        let (manager, backend) = manager();

        assert!(!manager.lock("R", i64::MAX).await);
        assert!(backend.is_empty());
        assert!(!manager.is_tracked("R"));

        // The resource is still free for a sane request
        assert!(manager.lock("R", 100).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_entry_replaced_by_relock() {
        let (manager, _) = manager();
        manager.lock("R", 100).await;
        let stale = manager.hold_deadline("R").unwrap();

        tokio::time::advance(Duration::from_secs(150)).await;
        // Unlock and re-lock after the sweep took its snapshot
        assert!(manager.unlock("R").await);
        assert!(manager.lock("R", 1000).await);
        let fresh = manager.hold_deadline("R").unwrap();

        let mut report = SweepReport::default();
        manager.sweep_entry("lock:R", stale, Instant::now(), &mut report).await;

        assert_eq!(report, SweepReport::default());
        assert_eq!(manager.hold_deadline("R"), Some(fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_skips_entry_removed_by_unlock() {
        let (manager, _) = manager();
        manager.lock("R", 100).await;
        manager.lock("S", 1000).await;
        let expired = manager.hold_deadline("R").unwrap();
        let live = manager.hold_deadline("S").unwrap();

        tokio::time::advance(Duration::from_secs(150)).await;
        // Both unlocked after the snapshot; the same node then takes short simple locks
        assert!(manager.unlock("R").await);
        assert!(manager.unlock("S").await);
        assert!(manager.simple_lock("R", 30).await);
        assert!(manager.simple_lock("S", 30).await);

        let now = Instant::now();
        let mut report = SweepReport::default();
        manager.sweep_entry("lock:R", expired, now, &mut report).await;
        manager.sweep_entry("lock:S", live, now, &mut report).await;

        assert_eq!(report, SweepReport::default());
        for resource in ["R", "S"] {
            let ttl = manager.holder(resource).await.unwrap().unwrap().ttl;
            assert_eq!(ttl, Some(Duration::from_secs(30)));
        }
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let backend = MemoryLockBackend::new();
        let settings = LockSettings {
            key_prefix: "app:lock:".to_string(),
            ..Default::default()
        };
        let manager = LockManager::with_node_id(Arc::new(backend.clone()), settings, "node-x");

        assert!(manager.lock("R", 0).await);
        let record = backend.get_record("app:lock:R").await.unwrap().unwrap();
        assert_eq!(record.owner, "node-x");
    }
}
