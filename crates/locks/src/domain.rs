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

//! Per-domain lock helpers keyed by application identifiers.
//!
//! Thin layer over [`LockManager::lock`] / [`LockManager::unlock`]: the id is
//! scoped with a domain word (`order:42`) and locked for a fixed maximum hold.

use crate::key::{is_blank, scoped_resource};
use crate::LockManager;
use std::sync::Arc;
use tracing::info;

/// Maximum hold of order locks, in seconds.
pub const ORDER_MAX_HOLD_SECS: i64 = 600;

/// Managed locks for one kind of application entity.
#[derive(Clone)]
pub struct DomainLocks {
    manager: Arc<LockManager>,
    domain: String,
    max_hold_secs: i64,
}

impl DomainLocks {
    pub fn new(manager: Arc<LockManager>, domain: impl Into<String>, max_hold_secs: i64) -> Self {
        Self {
            manager,
            domain: domain.into(),
            max_hold_secs,
        }
    }

    /// Order locks: domain `order`, held for at most ten minutes.
    pub fn orders(manager: Arc<LockManager>) -> Self {
        Self::new(manager, "order", ORDER_MAX_HOLD_SECS)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Lock the entity `id`. Blank ids fail without touching the store.
    pub async fn lock(&self, id: &str) -> bool {
        let locked = !is_blank(id)
            && self
                .manager
                .lock(&scoped_resource(&self.domain, id), self.max_hold_secs)
                .await;
        info!(domain = %self.domain, id, locked, "domain lock");
        locked
    }

    /// Unlock the entity `id`. Blank ids fail without touching the store.
    pub async fn unlock(&self, id: &str) -> bool {
        if is_blank(id) {
            return false;
        }
        let unlocked = self
            .manager
            .unlock(&scoped_resource(&self.domain, id))
            .await;
        info!(domain = %self.domain, id, unlocked, "domain unlock");
        unlocked
    }
}
