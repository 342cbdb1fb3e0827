// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use parkops_audit::{Actor, Cause};
use parkops_domain::{EventSource, LaneContext, NewSession, ParkingSession, SessionStatus};
use time::macros::datetime;

pub fn create_test_actor() -> Actor {
    Actor::new(String::from("op-7"), String::from("operator"))
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("req-100"), String::from("Lane event"))
}

pub fn create_test_entry() -> LaneContext {
    LaneContext {
        zone_id: Some(1),
        lane_id: Some(11),
        time: datetime!(2025-03-01 08:00 UTC),
        image_url: None,
        source: EventSource::Camera,
    }
}

pub fn create_test_exit() -> LaneContext {
    LaneContext {
        zone_id: Some(1),
        lane_id: Some(12),
        time: datetime!(2025-03-01 09:45 UTC),
        image_url: None,
        source: EventSource::Camera,
    }
}

pub fn create_test_new_session() -> NewSession {
    NewSession::new(1, "12GA3456", create_test_entry(), None, None).unwrap()
}

pub fn create_test_session(status: SessionStatus) -> ParkingSession {
    ParkingSession {
        session_id: 42,
        site_id: 1,
        car_number: String::from("12GA3456"),
        entry: create_test_entry(),
        exit: None,
        vehicle_type: None,
        status,
        total_fee: 0,
        discount_fee: 0,
        paid_fee: 0,
        applied_discounts: Vec::new(),
        note: None,
        pre_settled_at: None,
        created_at: datetime!(2025-03-01 08:00 UTC),
        updated_at: datetime!(2025-03-01 08:00 UTC),
    }
}
