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

//! Background refresh of managed locks.
//!
//! ## Design
//! - One tokio task per manager, independent of any request
//! - First sweep one full period after start, then every period
//! - Fixed-delay semantics: a slow sweep pushes the next one back instead
//!   of firing a burst of catch-up sweeps
//! - Stopped explicitly with [`LockRefresher::stop`], aborted on drop
//!
//! The period must stay well below the safety TTL so a live holder is
//! refreshed several times before the store would expire its key.

use crate::LockManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Handle to the periodic refresh task of a [`LockManager`].
pub struct LockRefresher {
    shutdown: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl LockRefresher {
    /// Spawn the refresh task on the current tokio runtime.
    pub fn start(manager: Arc<LockManager>, period: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                node_id = %manager.node_id(),
                period_secs = period.as_secs_f64(),
                "lock refresher started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = manager.refresh_sweep().await;
                        debug!(
                            refreshed = report.refreshed,
                            expired = report.expired,
                            failed = report.failed,
                            "periodic refresh"
                        );
                    }
                    _ = signal.notified() => {
                        break;
                    }
                }
            }

            info!(node_id = %manager.node_id(), "lock refresher stopped");
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// True while the background task is alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the task and wait for the sweep in progress, if any, to finish.
    pub async fn stop(mut self) {
        self.shutdown.notify_one();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!(error = %e, "lock refresher task failed");
                }
            }
        }
    }
}

impl Drop for LockRefresher {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
