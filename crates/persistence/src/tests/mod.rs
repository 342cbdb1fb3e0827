// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod calendar_tests;
mod initialization_tests;
mod policy_tests;

use parkops::Command;
use parkops_audit::{Actor, Cause};
use parkops_domain::{EventSource, LaneContext, NewSession, Site};
use time::OffsetDateTime;

use crate::Persistence;

pub fn create_test_actor() -> Actor {
    Actor::new(String::from("test-actor"), String::from("operator"))
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("test-cause"), String::from("Test operation"))
}

/// Opens a fresh database holding one site.
pub fn setup_site() -> (Persistence, Site) {
    let mut persistence = Persistence::new_in_memory().expect("Failed to create persistence");
    let site: Site = persistence
        .create_site("Central", "UTC", Some("1 Main St"))
        .expect("Failed to create site");
    (persistence, site)
}

pub fn lane_event(lane_id: Option<i64>, time: OffsetDateTime) -> LaneContext {
    LaneContext {
        zone_id: None,
        lane_id,
        time,
        image_url: None,
        source: EventSource::Camera,
    }
}

pub fn open_command(site_id: i64, car_number: &str, time: OffsetDateTime) -> Command {
    Command::OpenSession {
        session: NewSession::new(site_id, car_number, lane_event(None, time), None, None)
            .expect("Valid entry"),
    }
}

pub fn close_command(
    session_id: i64,
    time: OffsetDateTime,
    total_fee: i64,
    paid_fee: i64,
    forced: bool,
) -> Command {
    Command::CloseSession {
        session_id,
        exit: lane_event(None, time),
        total_fee,
        discount_fee: 0,
        paid_fee,
        applied_discounts: None,
        note: None,
        forced,
    }
}
