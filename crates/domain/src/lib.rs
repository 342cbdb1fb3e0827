// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Domain types and pure decision logic for the parking operations core.
//!
//! Nothing in this crate performs I/O. Persistence and transport layers
//! call into these types and rules and remain responsible for atomicity.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod dates;
mod error;
mod holiday;
mod membership;
mod paging;
mod policy;
mod session;
mod statistics;
mod topology;
mod validation;

#[cfg(test)]
mod tests;

pub use dates::{
    format_date, format_timestamp, local_date, local_day_start, parse_date, parse_timestamp,
    validate_timezone,
};
pub use error::DomainError;
pub use holiday::{
    Holiday, find_conflicting_holiday, holiday_matches, is_holiday, month_day_key,
};
pub use membership::{
    EffectiveMembership, EffectiveState, Member, PaymentHistory, PaymentStatus,
    find_effective_history, find_overlapping_history, intervals_overlap, validate_period,
};
pub use paging::{Page, PageRequest, SortDirection};
pub use policy::{
    BlacklistAction, BlacklistConfig, FeeConfig, MembershipConfig, NewPolicy, Policy,
    PolicyConfig, PolicyFilter, PolicySort, PolicyType, PolicyUpdate, ReductionConfig,
    ReductionKind, validate_initial_policies,
};
pub use session::{
    ACTIVE_STATUSES, AppliedDiscount, EventSource, LaneContext, NewSession, ParkingSession,
    SessionFilter, SessionPatch, SessionStatus,
};
pub use statistics::{SessionFigures, SiteStatistics, StatusCounts, rollup_statistics};
pub use topology::{
    ControllerToggle, Device, DeviceController, DeviceKind, Lane, LaneDirection, LaneNode, Site,
    SiteTree, Zone, ZoneNode, resolve_controller_toggle,
};
pub use validation::{
    normalize_car_number, validate_amount, validate_name, validate_optional_text, validate_port,
};
