// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use parkops_audit::{Actor, Cause};
use parkops_persistence::Persistence;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::{CreateSiteRequest, LaneEventRequest, OpenSessionRequest, SiteInfo, create_site};

pub fn create_test_actor() -> Actor {
    Actor::new(String::from("operator-7"), String::from("operator"))
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("api-req-456"), String::from("API request"))
}

/// The fixed clock used by handlers under test.
pub fn test_now() -> OffsetDateTime {
    datetime!(2025-03-01 10:00 UTC)
}

pub fn setup() -> Persistence {
    Persistence::new_in_memory().unwrap()
}

pub fn create_test_site(persistence: &mut Persistence, name: &str, timezone: &str) -> SiteInfo {
    create_site(
        persistence,
        &CreateSiteRequest {
            name: name.to_string(),
            timezone: Some(timezone.to_string()),
            address: None,
        },
    )
    .unwrap()
}

/// A persistence handle with one UTC site.
pub fn setup_site() -> (Persistence, SiteInfo) {
    let mut persistence: Persistence = setup();
    let site: SiteInfo = create_test_site(&mut persistence, "Central", "UTC");
    (persistence, site)
}

pub fn open_request(car_number: &str, time: &str) -> OpenSessionRequest {
    OpenSessionRequest {
        car_number: car_number.to_string(),
        entry: LaneEventRequest {
            time: Some(time.to_string()),
            ..LaneEventRequest::default()
        },
        vehicle_type: None,
        note: None,
    }
}
