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

//! Configuration for lock backends and lock manager policy.
//!
//! ## Environment Variables
//!
//! ### Backend Selection
//! - `SIMPLELOCK_BACKEND`: Backend type (default: "in-memory")
//!   - "in-memory" | "memory" → MemoryLockBackend
//!   - "redis" → RedisLockBackend
//! - `SIMPLELOCK_REDIS_URL`: Redis server URL (default: "redis://localhost:6379")
//!
//! ### Lock Policy
//! - `SIMPLELOCK_KEY_PREFIX`: Namespace prefix for lock keys (default: "lock:")
//! - `SIMPLELOCK_SAFETY_TTL_SECS`: Store TTL of managed locks (default: 600)
//! - `SIMPLELOCK_SIMPLE_TIMEOUT_SECS`: Default TTL of simple locks (default: 600)
//! - `SIMPLELOCK_MAX_HOLD_SECS`: Default maximum hold of managed locks (default: 6000)
//! - `SIMPLELOCK_REFRESH_INTERVAL_SECS`: Refresh sweep period (default: 50)
//!
//! ## Examples
//!
//! ### Redis
//! ```bash
//! export SIMPLELOCK_BACKEND=redis
//! export SIMPLELOCK_REDIS_URL=redis://localhost:6379
//! export SIMPLELOCK_KEY_PREFIX=orders:lock:
//! cargo run
//! ```

use crate::backend::LockBackend;
use crate::key::DEFAULT_LOCK_PREFIX;
use crate::{LockError, LockManager, LockResult};
use std::sync::Arc;
use std::time::Duration;

/// Store TTL of managed locks; bounds how long a crashed holder's lock survives.
pub const DEFAULT_SAFETY_TTL: Duration = Duration::from_secs(600);

/// TTL used by `simple_lock` when the caller passes a non-positive timeout.
pub const DEFAULT_SIMPLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Maximum hold used by `lock` when the caller passes a non-positive value.
pub const DEFAULT_MAX_HOLD: Duration = Duration::from_secs(6000);

/// Period of the refresh sweep; must stay well below the safety TTL.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(50);

const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Lock manager policy: key namespace, timeouts and sweep period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSettings {
    /// Prefix prepended to every resource identifier
    pub key_prefix: String,
    /// Store TTL of managed locks, re-armed by every sweep
    pub safety_ttl: Duration,
    /// Default TTL for `simple_lock`
    pub default_simple_timeout: Duration,
    /// Default maximum hold for `lock`
    pub default_max_hold: Duration,
    /// Period of the background refresh sweep
    pub refresh_interval: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_LOCK_PREFIX.to_string(),
            safety_ttl: DEFAULT_SAFETY_TTL,
            default_simple_timeout: DEFAULT_SIMPLE_TIMEOUT,
            default_max_hold: DEFAULT_MAX_HOLD,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl LockSettings {
    /// Check the settings for values the lock protocol cannot work with.
    pub fn validate(&self) -> LockResult<()> {
        if self.key_prefix.is_empty() {
            return Err(LockError::ConfigError(
                "key prefix must not be empty".to_string(),
            ));
        }

        for (name, value) in [
            ("safety_ttl", self.safety_ttl),
            ("default_simple_timeout", self.default_simple_timeout),
            ("default_max_hold", self.default_max_hold),
            ("refresh_interval", self.refresh_interval),
        ] {
            if value.as_millis() == 0 {
                return Err(LockError::ConfigError(format!("{} must be positive", name)));
            }
        }

        if self.refresh_interval >= self.safety_ttl {
            return Err(LockError::ConfigError(format!(
                "refresh interval ({}s) must be shorter than safety TTL ({}s)",
                self.refresh_interval.as_secs_f64(),
                self.safety_ttl.as_secs_f64()
            )));
        }

        Ok(())
    }

    /// Read lock policy from `SIMPLELOCK_*` variables, falling back to defaults.
    pub fn from_env() -> LockResult<Self> {
        let defaults = Self::default();
        let settings = Self {
            key_prefix: std::env::var("SIMPLELOCK_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            safety_ttl: env_secs("SIMPLELOCK_SAFETY_TTL_SECS", defaults.safety_ttl)?,
            default_simple_timeout: env_secs(
                "SIMPLELOCK_SIMPLE_TIMEOUT_SECS",
                defaults.default_simple_timeout,
            )?,
            default_max_hold: env_secs("SIMPLELOCK_MAX_HOLD_SECS", defaults.default_max_hold)?,
            refresh_interval: env_secs(
                "SIMPLELOCK_REFRESH_INTERVAL_SECS",
                defaults.refresh_interval,
            )?,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn env_secs(var: &str, default: Duration) -> LockResult<Duration> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| LockError::ConfigError(format!("{} must be whole seconds: {}", var, e))),
        Err(_) => Ok(default),
    }
}

/// Backend type configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendType {
    /// In-memory backend (default, single process only)
    #[default]
    InMemory,
    /// Redis backend (requires redis-backend feature)
    Redis {
        /// Redis server URL
        url: String,
    },
}

/// Full lock configuration: where locks live and how they are managed.
#[derive(Debug, Clone, Default)]
pub struct LockConfig {
    /// Backend type
    pub backend: BackendType,
    /// Lock manager policy
    pub settings: LockSettings,
}

impl LockConfig {
    /// Create configuration with explicit backend and default policy.
    pub fn new(backend: BackendType) -> Self {
        Self {
            backend,
            settings: LockSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: LockSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Create configuration from environment variables.
    ///
    /// See module documentation for the complete list.
    pub fn from_env() -> LockResult<Self> {
        let backend_str = std::env::var("SIMPLELOCK_BACKEND")
            .unwrap_or_else(|_| "in-memory".to_string())
            .to_lowercase();

        let backend = match backend_str.as_str() {
            "in-memory" | "memory" => BackendType::InMemory,
            "redis" => {
                let url = std::env::var("SIMPLELOCK_REDIS_URL")
                    .unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
                BackendType::Redis { url }
            }
            other => {
                return Err(LockError::ConfigError(format!(
                    "Unknown backend type: {}. Valid options: in-memory, redis",
                    other
                )));
            }
        };

        Ok(Self {
            backend,
            settings: LockSettings::from_env()?,
        })
    }
}

/// Create a lock backend from explicit configuration.
pub async fn create_backend_from_config(backend: &BackendType) -> LockResult<Arc<dyn LockBackend>> {
    match backend {
        #[cfg(feature = "memory-backend")]
        BackendType::InMemory => Ok(Arc::new(crate::memory::MemoryLockBackend::new())),

        #[cfg(not(feature = "memory-backend"))]
        BackendType::InMemory => Err(LockError::ConfigError(
            "In-memory backend requires 'memory-backend' feature".to_string(),
        )),

        #[cfg(feature = "redis-backend")]
        BackendType::Redis { url } => {
            let backend = crate::redis::RedisLockBackend::new(url).await?;
            Ok(Arc::new(backend))
        }

        #[cfg(not(feature = "redis-backend"))]
        BackendType::Redis { .. } => Err(LockError::ConfigError(
            "Redis backend requires 'redis-backend' feature".to_string(),
        )),
    }
}

/// Create a lock manager (fresh node identity) from explicit configuration.
pub async fn create_lock_manager_from_config(config: LockConfig) -> LockResult<Arc<LockManager>> {
    config.settings.validate()?;
    let backend = create_backend_from_config(&config.backend).await?;
    Ok(Arc::new(LockManager::with_settings(backend, config.settings)))
}

/// Create a lock manager from environment configuration.
pub async fn create_lock_manager_from_env() -> LockResult<Arc<LockManager>> {
    create_lock_manager_from_config(LockConfig::from_env()?).await
}
