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

//! Backend trait for the remote store that holds lock records.

use async_trait::async_trait;
use std::time::Duration;

use crate::LockResult;

/// Snapshot of a lock record as the store currently sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    /// Identity token stored under the key
    pub owner: String,
    /// Remaining time-to-live, `None` if the key has no expiry
    pub ttl: Option<Duration>,
}

/// Trait for the key-value store that lock records live in.
///
/// ## Purpose
/// Isolates the three atomic primitives the lock protocol needs. Every
/// mutating method must be a single atomic step from the store's point of
/// view: a read-compare-write split across round trips would let another
/// owner acquire in between and have its lock deleted or extended.
///
/// ## Design
/// - **Acquire**: conditional set, never overwrites a live value
/// - **Release**: compare owner token, then delete
/// - **Refresh**: compare owner token, then re-arm expiry (value unchanged)
///
/// Implementations are shared as `Arc<dyn LockBackend>`, so any number of
/// [`crate::LockStore`]s (one per node identity) can point at the same store.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Set `key` to `token` with expiry `ttl` only if the key does not exist.
    ///
    /// ## Returns
    /// - `Ok(true)`: the key was created
    /// - `Ok(false)`: the key is held (by anyone, including `token`)
    /// - `Err(LockError::BackendError)`: transport or protocol failure
    async fn set_if_absent(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool>;

    /// Delete `key` if its value equals `token`.
    ///
    /// ## Returns
    /// - `Ok(true)`: the key was deleted
    /// - `Ok(false)`: key absent or held by a different token
    async fn delete_if_owner(&self, key: &str, token: &str) -> LockResult<bool>;

    /// Reset the expiry of `key` to `ttl` if its value equals `token`.
    ///
    /// ## Returns
    /// - `Ok(true)`: expiry re-armed
    /// - `Ok(false)`: key absent or held by a different token
    async fn expire_if_owner(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool>;

    /// Read the current record for `key` (non-mutating).
    async fn get_record(&self, key: &str) -> LockResult<Option<LockRecord>>;

    /// Short backend name for logs and metric labels.
    fn backend_name(&self) -> &'static str;
}

/// Convert a TTL into whole milliseconds for `PX`/`PEXPIRE`, rejecting zero.
pub(crate) fn ttl_millis(key: &str, ttl: Duration) -> LockResult<u64> {
    let ms = ttl.as_millis();
    if ms == 0 || ms > u64::MAX as u128 {
        return Err(crate::LockError::InvalidTtl {
            key: key.to_string(),
            ttl_ms: ms,
        });
    }
    Ok(ms as u64)
}
