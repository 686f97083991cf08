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

//! Error types for lock backends and configuration.
//!
//! Lock operations themselves (`acquire`, `release`, `refresh`, `lock`, ...)
//! never surface these errors to callers; the [`crate::store::LockStore`]
//! boundary logs them and reports `false`. Construction, configuration and
//! inspection return [`LockResult`].

use thiserror::Error;

/// Result type for lock backend operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur while talking to a lock backend or building one.
#[derive(Error, Debug)]
pub enum LockError {
    /// TTL that the store cannot honour (zero or out of range)
    #[error("Invalid TTL for {key}: {ttl_ms}ms")]
    InvalidTtl { key: String, ttl_ms: u128 },

    /// Backend error (network, protocol, script execution)
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        LockError::BackendError(format!("Redis error: {}", err))
    }
}
