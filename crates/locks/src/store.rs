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

//! Ownership-aware lock store.
//!
//! `LockStore` binds a [`LockBackend`] to one node identity token and is the
//! error boundary of the lock protocol: backend failures are logged and
//! reported as "did not happen" (`false`), never propagated. A `false` from
//! `acquire` is always safe to treat as not held.

use crate::backend::{LockBackend, LockRecord};
use crate::LockResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Atomic acquire/release/refresh of single keys under one identity token.
#[derive(Clone)]
pub struct LockStore {
    backend: Arc<dyn LockBackend>,
    node_id: String,
}

impl LockStore {
    /// Create a store that writes `node_id` as the owner of every key it acquires.
    pub fn new(backend: Arc<dyn LockBackend>, node_id: impl Into<String>) -> Self {
        Self {
            backend,
            node_id: node_id.into(),
        }
    }

    /// Identity token used as the lock value.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn backend(&self) -> &Arc<dyn LockBackend> {
        &self.backend
    }

    /// Set `key` to this node's token if nobody holds it.
    ///
    /// Never overwrites an existing value. Returns `false` when the key is
    /// held (by anyone) or when the backend fails.
    #[instrument(level = "debug", skip(self), fields(backend = self.backend.backend_name()))]
    pub async fn acquire(&self, key: &str, ttl: Duration) -> bool {
        let result = self.backend.set_if_absent(key, &self.node_id, ttl).await;
        self.settle("acquire", key, result)
    }

    /// Delete `key` if this node owns it.
    ///
    /// Returns `false` when the key is absent, owned by another node, or on
    /// backend failure.
    #[instrument(level = "debug", skip(self), fields(backend = self.backend.backend_name()))]
    pub async fn release(&self, key: &str) -> bool {
        let result = self.backend.delete_if_owner(key, &self.node_id).await;
        self.settle("release", key, result)
    }

    /// Reset the expiry of `key` to `ttl` if this node owns it.
    #[instrument(level = "debug", skip(self), fields(backend = self.backend.backend_name()))]
    pub async fn refresh(&self, key: &str, ttl: Duration) -> bool {
        let result = self.backend.expire_if_owner(key, &self.node_id, ttl).await;
        self.settle("refresh", key, result)
    }

    /// Current record for `key`. Diagnostic only; ownership decisions are
    /// always made by the atomic operations above.
    pub async fn holder(&self, key: &str) -> LockResult<Option<LockRecord>> {
        self.backend.get_record(key).await
    }

    fn settle(&self, op: &'static str, key: &str, result: LockResult<bool>) -> bool {
        match result {
            Ok(done) => {
                let outcome = if done { "ok" } else { "rejected" };
                metrics::counter!("simplelock_store_operations_total", "op" => op, "result" => outcome)
                    .increment(1);
                debug!(op, key, done, "lock store operation finished");
                done
            }
            Err(e) => {
                metrics::counter!("simplelock_store_errors_total", "op" => op).increment(1);
                error!(
                    op,
                    key,
                    node_id = %self.node_id,
                    backend = self.backend.backend_name(),
                    error = %e,
                    "lock store operation failed"
                );
                false
            }
        }
    }
}
