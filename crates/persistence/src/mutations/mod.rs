// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Mutation modules for persistence layer.
//!
//! ## Module Organization
//!
//! - `audit`: Audit event persistence
//! - `topology`: Site, zone, lane, controller and device writes
//! - `policy`: Policy writes, reset and blacklist selection
//! - `calendar`: Holiday writes
//! - `membership`: Member and payment writes
//! - `sessions`: Session command persistence
//!
//! Multi-step writes run inside `immediate_transaction`, which takes the
//! SQLite write lock up front; any error rolls the whole unit back.

pub mod audit;
pub mod calendar;
pub mod membership;
pub mod policy;
pub mod sessions;
pub mod topology;

use parkops_domain::format_timestamp;
use time::OffsetDateTime;

use crate::error::PersistenceError;

/// The current time in stored timestamp form.
pub(crate) fn now_timestamp() -> Result<String, PersistenceError> {
    Ok(format_timestamp(OffsetDateTime::now_utc())?)
}
