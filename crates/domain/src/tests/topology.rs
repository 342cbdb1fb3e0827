// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{
    ControllerToggle, Device, DeviceController, DeviceKind, Lane, LaneDirection, Site, SiteTree,
    Zone, resolve_controller_toggle,
};
use std::str::FromStr;

fn site() -> Site {
    Site {
        site_id: 1,
        name: String::from("Central"),
        timezone: String::from("UTC"),
        address: None,
    }
}

fn device(id: i64, site_id: i64, lane_id: Option<i64>) -> Device {
    Device {
        device_id: id,
        site_id,
        lane_id,
        controller_id: None,
        name: format!("dev-{id}"),
        kind: DeviceKind::EntryCamera,
    }
}

#[test]
fn test_enum_parsing() {
    assert_eq!(DeviceKind::from_str("EXIT_CAMERA").unwrap(), DeviceKind::ExitCamera);
    assert!(DeviceKind::from_str("DRONE").is_err());
    assert_eq!(LaneDirection::from_str("BOTH").unwrap(), LaneDirection::Both);
    assert_eq!(LaneDirection::Entry.to_string(), "ENTRY");
}

#[test]
fn test_toggle_releases_own_controller() {
    let toggle = resolve_controller_toggle(Some(1), 1);
    assert_eq!(toggle, ControllerToggle::Released);
    assert_eq!(toggle.resulting_site_id(1), None);
    assert!(!toggle.is_steal());
}

#[test]
fn test_toggle_claims_free_controller() {
    let toggle = resolve_controller_toggle(None, 1);
    assert_eq!(
        toggle,
        ControllerToggle::Claimed {
            previous_site_id: None
        }
    );
    assert_eq!(toggle.resulting_site_id(1), Some(1));
    assert!(!toggle.is_steal());
}

#[test]
fn test_toggle_steals_from_other_site() {
    let toggle = resolve_controller_toggle(Some(2), 1);
    assert!(toggle.is_steal());
    assert_eq!(toggle.resulting_site_id(1), Some(1));
}

#[test]
fn test_assemble_tree() {
    let controllers = vec![
        DeviceController {
            controller_id: 1,
            site_id: Some(1),
            name: String::from("ctl-a"),
            host: String::from("10.0.0.2"),
            port: 5000,
        },
        DeviceController {
            controller_id: 2,
            site_id: Some(9),
            name: String::from("ctl-b"),
            host: String::from("10.0.0.3"),
            port: 5000,
        },
    ];
    let zones = vec![Zone {
        zone_id: 10,
        site_id: 1,
        name: String::from("B1"),
    }];
    let lanes = vec![
        Lane {
            lane_id: 100,
            zone_id: 10,
            name: String::from("In"),
            direction: LaneDirection::Entry,
        },
        Lane {
            lane_id: 101,
            zone_id: 10,
            name: String::from("Out"),
            direction: LaneDirection::Exit,
        },
    ];
    let devices = vec![
        device(1, 1, Some(100)),
        device(2, 1, Some(100)),
        device(3, 1, None),
        device(4, 2, None),
    ];

    let tree = SiteTree::assemble(site(), controllers, zones, lanes, devices);
    assert_eq!(tree.controllers.len(), 1);
    assert_eq!(tree.zones.len(), 1);
    assert_eq!(tree.zones[0].lanes.len(), 2);
    assert_eq!(
        tree.zones[0].lanes[0]
            .devices
            .iter()
            .map(|d| d.device_id)
            .collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert!(tree.zones[0].lanes[1].devices.is_empty());
    assert_eq!(
        tree.unassigned_devices
            .iter()
            .map(|d| d.device_id)
            .collect::<Vec<_>>(),
        vec![3]
    );
}
