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

//! Lock key naming.
//!
//! Store keys are `<prefix><resource>`. The prefix is fixed per key space,
//! so two different resources can never map to the same key. Domain helpers
//! build resources such as `order:42`, giving store keys like `lock:order:42`.

/// Default namespace prefix for lock keys.
pub const DEFAULT_LOCK_PREFIX: &str = "lock:";

/// Fixed namespace that resource identifiers are prefixed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockKeySpace {
    prefix: String,
}

impl LockKeySpace {
    /// Create a key space with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Store key for a resource identifier.
    pub fn key_for(&self, resource: &str) -> String {
        format!("{}{}", self.prefix, resource)
    }

    /// Resource identifier for a store key, if it belongs to this key space.
    pub fn resource_of<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())
    }
}

impl Default for LockKeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_PREFIX)
    }
}

/// Resource identifier scoped by a domain word, e.g. `order:42`.
pub fn scoped_resource(domain: &str, id: &str) -> String {
    format!("{}:{}", domain, id)
}

/// True for identifiers that must never reach the store (empty or whitespace).
pub fn is_blank(resource: &str) -> bool {
    resource.trim().is_empty()
}
