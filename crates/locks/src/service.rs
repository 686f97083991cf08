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

//! Lock service wiring: backend, manager and refresher started together.

use crate::config::{create_backend_from_config, LockConfig};
use crate::{LockManager, LockRefresher, LockResult};
use std::sync::Arc;
use tracing::info;

/// A running lock manager with its background refresher.
///
/// ## Example
/// ```rust
/// use simplelock_locks::{LockConfig, LockService};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = LockService::start(LockConfig::from_env()?).await?;
/// let manager = service.manager();
/// if manager.lock("orderId=42", 0).await {
///     manager.unlock("orderId=42").await;
/// }
/// service.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct LockService {
    manager: Arc<LockManager>,
    refresher: LockRefresher,
}

impl LockService {
    /// Build the backend, create a manager with a fresh node identity and
    /// start its refresher.
    pub async fn start(config: LockConfig) -> LockResult<Self> {
        config.settings.validate()?;
        let backend = create_backend_from_config(&config.backend).await?;
        let manager = Arc::new(LockManager::with_settings(backend, config.settings));
        let refresher = manager.spawn_refresher();

        info!(node_id = %manager.node_id(), "lock service started");
        Ok(Self { manager, refresher })
    }

    pub fn manager(&self) -> Arc<LockManager> {
        Arc::clone(&self.manager)
    }

    pub fn is_running(&self) -> bool {
        self.refresher.is_running()
    }

    /// Stop the refresher. Held locks are not released; their store TTL drains.
    pub async fn shutdown(self) {
        self.refresher.stop().await;
        info!(node_id = %self.manager.node_id(), "lock service stopped");
    }
}

#[cfg(all(test, feature = "memory-backend"))]
mod tests {
    use super::*;
    use crate::config::{BackendType, LockSettings};
    use crate::LockError;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_service_refreshes_managed_locks() {
        let service = LockService::start(LockConfig::new(BackendType::InMemory))
            .await
            .unwrap();
        assert!(service.is_running());

        let manager = service.manager();
        assert!(manager.lock("R", 0).await);
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert!(manager.holder("R").await.unwrap().is_some());

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_service_rejects_invalid_settings() {
        let config = LockConfig::new(BackendType::InMemory).with_settings(LockSettings {
            refresh_interval: Duration::from_secs(900),
            ..Default::default()
        });
        let result = LockService::start(config).await;
        assert!(matches!(result, Err(LockError::ConfigError(_))));
    }
}
