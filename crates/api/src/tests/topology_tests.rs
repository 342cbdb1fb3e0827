// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use parkops_persistence::Persistence;

use super::helpers::{create_test_actor, create_test_cause, create_test_site, setup, setup_site};
use crate::{
    ApiError, AssignDevicesRequest, ControllerInfo, CreateControllerRequest, CreateSiteRequest,
    DeviceInfo, DeviceRequest, LaneInfo, LaneRequest, ListControllersQuery, SiteInfo,
    SiteTreeResponse, ToggleControllerResponse, UpdateSiteRequest, ZoneInfo, ZoneRequest,
    assign_devices_to_lane, create_controller, create_device, create_lane, create_site,
    create_zone, delete_lane, delete_site, get_audit_event, get_device, get_site, get_site_tree,
    list_controllers, list_devices, list_zones, toggle_controller_site, update_site,
};

fn zone(persistence: &mut Persistence, site_id: i64, name: &str) -> ZoneInfo {
    create_zone(
        persistence,
        site_id,
        &ZoneRequest {
            name: name.to_string(),
        },
    )
    .unwrap()
}

fn lane(persistence: &mut Persistence, zone_id: i64, name: &str) -> LaneInfo {
    create_lane(
        persistence,
        zone_id,
        &LaneRequest {
            name: name.to_string(),
            direction: None,
        },
    )
    .unwrap()
}

fn device(persistence: &mut Persistence, site_id: i64, name: &str) -> DeviceInfo {
    create_device(
        persistence,
        site_id,
        &DeviceRequest {
            lane_id: None,
            controller_id: None,
            name: name.to_string(),
            kind: String::from("ENTRY_CAMERA"),
        },
    )
    .unwrap()
}

fn controller(persistence: &mut Persistence, site_id: Option<i64>, name: &str) -> ControllerInfo {
    create_controller(
        persistence,
        &CreateControllerRequest {
            site_id,
            name: name.to_string(),
            host: String::from("10.0.0.5"),
            port: 9000,
        },
    )
    .unwrap()
}

// ============================================================================
// Sites
// ============================================================================

#[test]
fn test_create_site_defaults_timezone_and_trims_fields() {
    let mut persistence: Persistence = setup();

    let site: SiteInfo = create_site(
        &mut persistence,
        &CreateSiteRequest {
            name: String::from("  Central  "),
            timezone: None,
            address: Some(String::from("   ")),
        },
    )
    .unwrap();

    assert_eq!(site.name, "Central");
    assert_eq!(site.timezone, "UTC");
    assert_eq!(site.address, None);
}

#[test]
fn test_create_site_rejects_blank_name_and_unknown_timezone() {
    let mut persistence: Persistence = setup();

    let blank = create_site(
        &mut persistence,
        &CreateSiteRequest {
            name: String::from("   "),
            timezone: None,
            address: None,
        },
    );
    assert!(matches!(blank, Err(ApiError::InvalidInput { ref field, .. }) if field == "name"));

    let bad_zone = create_site(
        &mut persistence,
        &CreateSiteRequest {
            name: String::from("Central"),
            timezone: Some(String::from("Mars/Olympus")),
            address: None,
        },
    );
    assert!(
        matches!(bad_zone, Err(ApiError::InvalidInput { ref field, .. }) if field == "timezone")
    );
}

#[test]
fn test_duplicate_site_name_is_name_conflict() {
    let (mut persistence, _site) = setup_site();

    let result = create_site(
        &mut persistence,
        &CreateSiteRequest {
            name: String::from("Central"),
            timezone: None,
            address: None,
        },
    );
    assert!(matches!(
        result,
        Err(ApiError::NameConflict { ref resource_type, .. }) if resource_type == "Site"
    ));
}

#[test]
fn test_update_and_delete_site() {
    let (mut persistence, site) = setup_site();

    let updated: SiteInfo = update_site(
        &mut persistence,
        site.site_id,
        &UpdateSiteRequest {
            name: String::from("Central Plaza"),
            timezone: String::from("Asia/Seoul"),
            address: Some(String::from("1 Main St")),
        },
    )
    .unwrap();
    assert_eq!(updated.timezone, "Asia/Seoul");
    assert_eq!(updated.address.as_deref(), Some("1 Main St"));

    delete_site(&mut persistence, site.site_id).unwrap();
    assert!(matches!(
        get_site(&mut persistence, site.site_id),
        Err(ApiError::ResourceNotFound { ref resource_type, .. }) if resource_type == "Site"
    ));
    assert!(matches!(
        delete_site(&mut persistence, site.site_id),
        Err(ApiError::ResourceNotFound { .. })
    ));
}

// ============================================================================
// Zones, Lanes & Devices
// ============================================================================

#[test]
fn test_zone_in_missing_site_is_parent_not_found() {
    let mut persistence: Persistence = setup();

    let result = create_zone(
        &mut persistence,
        41,
        &ZoneRequest {
            name: String::from("B1"),
        },
    );
    assert!(matches!(
        result,
        Err(ApiError::ParentNotFound { ref resource_type, .. }) if resource_type == "Site"
    ));
}

#[test]
fn test_list_zones_of_missing_site_is_not_found() {
    let mut persistence: Persistence = setup();

    assert!(matches!(
        list_zones(&mut persistence, 41),
        Err(ApiError::ResourceNotFound { .. })
    ));
}

#[test]
fn test_lane_direction_defaults_to_both_and_rejects_unknown() {
    let (mut persistence, site) = setup_site();
    let b1: ZoneInfo = zone(&mut persistence, site.site_id, "B1");

    let gate: LaneInfo = lane(&mut persistence, b1.zone_id, "Gate 1");
    assert_eq!(gate.direction, "BOTH");

    let result = create_lane(
        &mut persistence,
        b1.zone_id,
        &LaneRequest {
            name: String::from("Gate 2"),
            direction: Some(String::from("SIDEWAYS")),
        },
    );
    assert!(
        matches!(result, Err(ApiError::InvalidInput { ref field, .. }) if field == "direction")
    );
}

#[test]
fn test_duplicate_lane_name_in_zone_is_name_conflict() {
    let (mut persistence, site) = setup_site();
    let b1: ZoneInfo = zone(&mut persistence, site.site_id, "B1");
    lane(&mut persistence, b1.zone_id, "Gate 1");

    let result = create_lane(
        &mut persistence,
        b1.zone_id,
        &LaneRequest {
            name: String::from("Gate 1"),
            direction: Some(String::from("EXIT")),
        },
    );
    assert!(matches!(
        result,
        Err(ApiError::NameConflict { ref resource_type, .. }) if resource_type == "Lane"
    ));
}

#[test]
fn test_create_device_rejects_unknown_kind() {
    let (mut persistence, site) = setup_site();

    let result = create_device(
        &mut persistence,
        site.site_id,
        &DeviceRequest {
            lane_id: None,
            controller_id: None,
            name: String::from("Cam 1"),
            kind: String::from("TOASTER"),
        },
    );
    assert!(matches!(result, Err(ApiError::InvalidInput { ref field, .. }) if field == "kind"));
}

#[test]
fn test_assign_devices_replaces_lane_set() {
    let (mut persistence, site) = setup_site();
    let b1: ZoneInfo = zone(&mut persistence, site.site_id, "B1");
    let gate: LaneInfo = lane(&mut persistence, b1.zone_id, "Gate 1");
    let cam: DeviceInfo = device(&mut persistence, site.site_id, "Cam 1");
    let barrier: DeviceInfo = device(&mut persistence, site.site_id, "Barrier 1");

    assign_devices_to_lane(
        &mut persistence,
        gate.lane_id,
        &AssignDevicesRequest {
            device_ids: vec![cam.device_id],
        },
    )
    .unwrap();
    let response = assign_devices_to_lane(
        &mut persistence,
        gate.lane_id,
        &AssignDevicesRequest {
            device_ids: vec![barrier.device_id],
        },
    )
    .unwrap();

    let ids: Vec<i64> = response.devices.iter().map(|d| d.device_id).collect();
    assert_eq!(ids, vec![barrier.device_id]);
    assert_eq!(
        get_device(&mut persistence, cam.device_id).unwrap().lane_id,
        None
    );
}

#[test]
fn test_assign_foreign_device_rolls_back() {
    let (mut persistence, site) = setup_site();
    let other: SiteInfo = create_test_site(&mut persistence, "North", "UTC");
    let b1: ZoneInfo = zone(&mut persistence, site.site_id, "B1");
    let gate: LaneInfo = lane(&mut persistence, b1.zone_id, "Gate 1");
    let cam: DeviceInfo = device(&mut persistence, site.site_id, "Cam 1");
    let foreign: DeviceInfo = device(&mut persistence, other.site_id, "Cam 9");
    assign_devices_to_lane(
        &mut persistence,
        gate.lane_id,
        &AssignDevicesRequest {
            device_ids: vec![cam.device_id],
        },
    )
    .unwrap();

    let result = assign_devices_to_lane(
        &mut persistence,
        gate.lane_id,
        &AssignDevicesRequest {
            device_ids: vec![foreign.device_id],
        },
    );
    assert!(matches!(
        result,
        Err(ApiError::ResourceNotFound { ref resource_type, .. }) if resource_type == "Device"
    ));
    assert_eq!(
        get_device(&mut persistence, cam.device_id).unwrap().lane_id,
        Some(gate.lane_id)
    );
}

#[test]
fn test_assign_to_missing_lane_is_parent_not_found() {
    let (mut persistence, _site) = setup_site();

    let result = assign_devices_to_lane(
        &mut persistence,
        77,
        &AssignDevicesRequest { device_ids: vec![] },
    );
    assert!(matches!(
        result,
        Err(ApiError::ParentNotFound { ref resource_type, .. }) if resource_type == "Lane"
    ));
}

#[test]
fn test_deleting_lane_detaches_devices() {
    let (mut persistence, site) = setup_site();
    let b1: ZoneInfo = zone(&mut persistence, site.site_id, "B1");
    let gate: LaneInfo = lane(&mut persistence, b1.zone_id, "Gate 1");
    let cam: DeviceInfo = device(&mut persistence, site.site_id, "Cam 1");
    assign_devices_to_lane(
        &mut persistence,
        gate.lane_id,
        &AssignDevicesRequest {
            device_ids: vec![cam.device_id],
        },
    )
    .unwrap();

    delete_lane(&mut persistence, gate.lane_id).unwrap();

    let devices = list_devices(&mut persistence, site.site_id).unwrap();
    assert_eq!(devices.devices.len(), 1);
    assert_eq!(devices.devices[0].lane_id, None);
}

#[test]
fn test_site_tree_nests_zones_lanes_and_devices() {
    let (mut persistence, site) = setup_site();
    let b1: ZoneInfo = zone(&mut persistence, site.site_id, "B1");
    let gate: LaneInfo = lane(&mut persistence, b1.zone_id, "Gate 1");
    let cam: DeviceInfo = device(&mut persistence, site.site_id, "Cam 1");
    device(&mut persistence, site.site_id, "Spare");
    controller(&mut persistence, Some(site.site_id), "Rack A");
    assign_devices_to_lane(
        &mut persistence,
        gate.lane_id,
        &AssignDevicesRequest {
            device_ids: vec![cam.device_id],
        },
    )
    .unwrap();

    let tree: SiteTreeResponse = get_site_tree(&mut persistence, site.site_id).unwrap();

    assert_eq!(tree.site.site_id, site.site_id);
    assert_eq!(tree.controllers.len(), 1);
    assert_eq!(tree.zones.len(), 1);
    assert_eq!(tree.zones[0].lanes.len(), 1);
    assert_eq!(tree.zones[0].lanes[0].devices[0].name, "Cam 1");
    assert_eq!(tree.unassigned_devices.len(), 1);
    assert_eq!(tree.unassigned_devices[0].name, "Spare");
}

// ============================================================================
// Controllers
// ============================================================================

#[test]
fn test_create_controller_validates_port() {
    let mut persistence: Persistence = setup();

    for port in [0_u32, 70_000] {
        let result = create_controller(
            &mut persistence,
            &CreateControllerRequest {
                site_id: None,
                name: String::from("Rack A"),
                host: String::from("10.0.0.5"),
                port,
            },
        );
        assert!(matches!(result, Err(ApiError::InvalidInput { ref field, .. }) if field == "port"));
    }
}

#[test]
fn test_toggle_claims_then_releases_controller() {
    let (mut persistence, site) = setup_site();
    let rack: ControllerInfo = controller(&mut persistence, None, "Rack A");

    let claimed: ToggleControllerResponse = toggle_controller_site(
        &mut persistence,
        site.site_id,
        rack.controller_id,
        create_test_actor(),
        create_test_cause(),
    )
    .unwrap();
    assert_eq!(claimed.site_id, Some(site.site_id));
    assert_eq!(claimed.previous_site_id, None);
    let event = get_audit_event(&mut persistence, claimed.event_id).unwrap();
    assert_eq!(event.action_name, "ClaimDeviceController");
    assert_eq!(event.actor_id, "operator-7");

    let released: ToggleControllerResponse = toggle_controller_site(
        &mut persistence,
        site.site_id,
        rack.controller_id,
        create_test_actor(),
        create_test_cause(),
    )
    .unwrap();
    assert_eq!(released.site_id, None);
    assert_eq!(released.previous_site_id, Some(site.site_id));

    let unassigned = list_controllers(
        &mut persistence,
        &ListControllersQuery {
            unassigned_only: Some(true),
        },
    )
    .unwrap();
    assert_eq!(unassigned.controllers.len(), 1);
}

#[test]
fn test_toggle_takes_controller_from_other_site() {
    let (mut persistence, site) = setup_site();
    let other: SiteInfo = create_test_site(&mut persistence, "North", "UTC");
    let rack: ControllerInfo = controller(&mut persistence, Some(other.site_id), "Rack A");

    let claimed: ToggleControllerResponse = toggle_controller_site(
        &mut persistence,
        site.site_id,
        rack.controller_id,
        create_test_actor(),
        create_test_cause(),
    )
    .unwrap();

    assert_eq!(claimed.site_id, Some(site.site_id));
    assert_eq!(claimed.previous_site_id, Some(other.site_id));
}

#[test]
fn test_toggle_missing_controller_is_not_found() {
    let (mut persistence, site) = setup_site();

    let result = toggle_controller_site(
        &mut persistence,
        site.site_id,
        5,
        create_test_actor(),
        create_test_cause(),
    );
    assert!(matches!(
        result,
        Err(ApiError::ResourceNotFound { ref resource_type, .. })
            if resource_type == "Device controller"
    ));
}
