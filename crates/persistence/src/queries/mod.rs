// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Query modules for persistence layer.
//!
//! This module contains all read-only queries for the persistence layer.
//!
//! ## Module Organization
//!
//! - `topology`: Sites, zones, lanes, controllers, devices and the site tree
//! - `policy`: Policy lookup and paged listing
//! - `calendar`: Holidays
//! - `membership`: Members and payment history
//! - `sessions`: Parking sessions
//! - `statistics`: Dashboard rollups
//! - `audit`: Audit trail
//!
//! Row structs mirror `diesel_schema` and are converted into domain values
//! here. Stored text that no longer parses is reported as `CorruptRow`.

pub mod audit;
pub mod calendar;
pub mod membership;
pub mod policy;
pub mod sessions;
pub mod statistics;
pub mod topology;

use num_traits::ToPrimitive;
use parkops_domain::{parse_date, parse_timestamp};
use time::{Date, OffsetDateTime};

use crate::error::PersistenceError;

pub(crate) fn stored_timestamp(value: &str) -> Result<OffsetDateTime, PersistenceError> {
    parse_timestamp(value).map_err(|e| PersistenceError::corrupt(&e))
}

pub(crate) fn stored_date(value: &str) -> Result<Date, PersistenceError> {
    parse_date(value).map_err(|e| PersistenceError::corrupt(&e))
}

pub(crate) fn stored_count(value: i64) -> Result<u64, PersistenceError> {
    value
        .to_u64()
        .ok_or_else(|| PersistenceError::CorruptRow(format!("negative count {value}")))
}

pub(crate) const fn stored_flag(value: i32) -> bool {
    value != 0
}

/// Escapes `LIKE` wildcards so user input matches literally.
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut escaped: String = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
