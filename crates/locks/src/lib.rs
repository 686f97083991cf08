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

//! # SimpleLock Distributed Locks
//!
//! ## Purpose
//! Mutual-exclusion locks whose state lives in a shared key-value store
//! (Redis), so independent processes can agree that a named resource ("this
//! order is being processed") is owned by exactly one of them.
//!
//! ## Design Decisions
//! - **Ownership tokens**: every manager writes its own random node identity
//!   as the lock value; release and refresh only act when the value matches
//! - **Atomic store steps**: conditional set for acquire, server-side
//!   compare-and-delete / compare-and-expire scripts for release and refresh
//! - **Crash safety via TTL**: managed locks carry a short safety TTL, so a
//!   dead holder's lock lapses on its own
//! - **Automatic refresh**: a background sweep re-arms the safety TTL of
//!   every managed lock until its maximum hold deadline passes
//! - **Fail closed**: store failures are logged and reported as `false`
//!
//! Not a consensus protocol and no fencing tokens: under store failover or
//! partitions the guarantee is best effort, with staleness bounded by the TTL.
//!
//! ## Backend Support
//! - **InMemory**: DashMap-based (feature: `memory-backend`, default)
//! - **Redis**: `SET NX PX` + Lua scripts (feature: `redis-backend`)
//!
//! ## Examples
//!
//! ### Basic Usage
//! ```rust
//! # #[cfg(feature = "memory-backend")]
//! use simplelock_locks::{LockManager, memory::MemoryLockBackend};
//! use std::sync::Arc;
//!
//! # #[cfg(feature = "memory-backend")]
//! # async fn example() {
//! let manager = Arc::new(LockManager::new(Arc::new(MemoryLockBackend::new())));
//! let refresher = manager.spawn_refresher();
//!
//! // Managed lock: kept alive by the refresher for up to 100 seconds
//! if manager.lock("orderId=42", 100).await {
//!     // ... critical section ...
//!     manager.unlock("orderId=42").await;
//! }
//!
//! refresher.stop().await;
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod domain;
pub mod error;
pub mod identity;
pub mod key;
pub mod manager;
pub mod refresher;
pub mod service;
pub mod store;

#[cfg(feature = "memory-backend")]
pub mod memory;

#[cfg(feature = "redis-backend")]
pub mod redis;

pub use backend::{LockBackend, LockRecord};
pub use config::{
    create_backend_from_config, create_lock_manager_from_config, create_lock_manager_from_env,
    BackendType, LockConfig, LockSettings,
};
pub use domain::DomainLocks;
pub use error::{LockError, LockResult};
pub use key::LockKeySpace;
pub use manager::{LockManager, SweepReport};
pub use refresher::LockRefresher;
pub use service::LockService;
pub use store::LockStore;
