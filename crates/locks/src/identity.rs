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

//! Node identity tokens.
//!
//! A token is written as the value of every lock key a manager acquires and
//! is what release/refresh compare against. 128 random bits (UUID v4) are
//! encoded as URL-safe base64 without padding: 22 printable characters.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use uuid::Uuid;

/// Length of a generated node identity token.
pub const NODE_ID_LEN: usize = 22;

/// Generate a fresh node identity token.
pub fn generate_node_id() -> String {
    URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}
