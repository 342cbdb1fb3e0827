// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Topology mutations.
//!
//! Sites, zones, lanes, device controllers and devices. Names are unique
//! within their parent; deleting a parent cascades to its children while
//! devices and controllers are detached rather than removed.

use diesel::SqliteConnection;
use diesel::prelude::*;
use parkops::apply_controller_toggle;
use parkops_audit::{Actor, Cause};
use parkops_domain::{Device, DeviceController, DeviceKind, Lane, LaneDirection, Site, Zone};
use tracing::{debug, info, warn};

use crate::backend::PersistenceBackend;
use crate::data_models::ControllerToggleOutcome;
use crate::diesel_schema::{device_controllers, devices, lanes, sites, zones};
use crate::error::PersistenceError;
use crate::mutations::audit::persist_audit_event;
use crate::mutations::now_timestamp;
use crate::queries::topology::{
    get_controller, get_device, get_lane, get_site, get_zone, lane_site_id, list_lane_devices,
    require_site,
};

fn expect_affected(affected: usize, entity: &'static str, id: i64) -> Result<(), PersistenceError> {
    if affected == 0 {
        return Err(PersistenceError::NotFound { entity, id });
    }
    Ok(())
}

fn reload<T>(value: Option<T>, entity: &'static str, id: i64) -> Result<T, PersistenceError> {
    value.ok_or(PersistenceError::NotFound { entity, id })
}

/// Creates a site.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `name` - Validated site name, unique across sites
/// * `timezone` - Validated IANA timezone
/// * `address` - Optional postal address
///
/// # Errors
///
/// Returns `PersistenceError::NameConflict` if the name is taken.
pub fn create_site(
    conn: &mut SqliteConnection,
    name: &str,
    timezone: &str,
    address: Option<&str>,
) -> Result<Site, PersistenceError> {
    let now: String = now_timestamp()?;
    diesel::insert_into(sites::table)
        .values((
            sites::name.eq(name),
            sites::timezone.eq(timezone),
            sites::address.eq(address),
            sites::created_at.eq(&now),
            sites::updated_at.eq(&now),
        ))
        .execute(conn)
        .map_err(PersistenceError::on_unique("site", name))?;

    let site_id: i64 = conn.get_last_insert_rowid()?;
    info!(site_id, name, timezone, "Created site");
    require_site(conn, site_id)
}

/// Replaces the descriptive fields of a site.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the site does not exist, or
/// `PersistenceError::NameConflict` if the new name is taken.
pub fn update_site(
    conn: &mut SqliteConnection,
    site_id: i64,
    name: &str,
    timezone: &str,
    address: Option<&str>,
) -> Result<Site, PersistenceError> {
    let affected: usize = diesel::update(sites::table.filter(sites::site_id.eq(site_id)))
        .set((
            sites::name.eq(name),
            sites::timezone.eq(timezone),
            sites::address.eq(address),
            sites::updated_at.eq(now_timestamp()?),
        ))
        .execute(conn)
        .map_err(PersistenceError::on_unique("site", name))?;
    expect_affected(affected, "site", site_id)?;

    debug!(site_id, name, "Updated site");
    require_site(conn, site_id)
}

/// Deletes a site and everything it owns.
///
/// Zones, lanes, devices, policies, holidays, members and sessions go with
/// it; controllers it held become unassigned.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the site does not exist.
pub fn delete_site(conn: &mut SqliteConnection, site_id: i64) -> Result<(), PersistenceError> {
    let affected: usize =
        diesel::delete(sites::table.filter(sites::site_id.eq(site_id))).execute(conn)?;
    expect_affected(affected, "site", site_id)?;
    info!(site_id, "Deleted site");
    Ok(())
}

/// Creates a zone within a site.
///
/// # Errors
///
/// Returns `PersistenceError::ParentNotFound` if the site does not exist, or
/// `PersistenceError::NameConflict` if the site already has a zone of that name.
pub fn create_zone(
    conn: &mut SqliteConnection,
    site_id: i64,
    name: &str,
) -> Result<Zone, PersistenceError> {
    diesel::insert_into(zones::table)
        .values((
            zones::site_id.eq(site_id),
            zones::name.eq(name),
            zones::created_at.eq(now_timestamp()?),
        ))
        .execute(conn)
        .map_err(PersistenceError::on_unique("zone", name))
        .map_err(PersistenceError::on_foreign_key("site", site_id))?;

    let zone_id: i64 = conn.get_last_insert_rowid()?;
    debug!(site_id, zone_id, name, "Created zone");
    reload(get_zone(conn, zone_id)?, "zone", zone_id)
}

/// Renames a zone.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the zone does not exist, or
/// `PersistenceError::NameConflict` if the name is taken within its site.
pub fn update_zone(
    conn: &mut SqliteConnection,
    zone_id: i64,
    name: &str,
) -> Result<Zone, PersistenceError> {
    let affected: usize = diesel::update(zones::table.filter(zones::zone_id.eq(zone_id)))
        .set(zones::name.eq(name))
        .execute(conn)
        .map_err(PersistenceError::on_unique("zone", name))?;
    expect_affected(affected, "zone", zone_id)?;
    reload(get_zone(conn, zone_id)?, "zone", zone_id)
}

/// Deletes a zone and its lanes. Devices on those lanes are detached.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the zone does not exist.
pub fn delete_zone(conn: &mut SqliteConnection, zone_id: i64) -> Result<(), PersistenceError> {
    let affected: usize =
        diesel::delete(zones::table.filter(zones::zone_id.eq(zone_id))).execute(conn)?;
    expect_affected(affected, "zone", zone_id)?;
    debug!(zone_id, "Deleted zone");
    Ok(())
}

/// Creates a lane within a zone.
///
/// # Errors
///
/// Returns `PersistenceError::ParentNotFound` if the zone does not exist, or
/// `PersistenceError::NameConflict` if the zone already has a lane of that name.
pub fn create_lane(
    conn: &mut SqliteConnection,
    zone_id: i64,
    name: &str,
    direction: LaneDirection,
) -> Result<Lane, PersistenceError> {
    diesel::insert_into(lanes::table)
        .values((
            lanes::zone_id.eq(zone_id),
            lanes::name.eq(name),
            lanes::direction.eq(direction.as_str()),
            lanes::created_at.eq(now_timestamp()?),
        ))
        .execute(conn)
        .map_err(PersistenceError::on_unique("lane", name))
        .map_err(PersistenceError::on_foreign_key("zone", zone_id))?;

    let lane_id: i64 = conn.get_last_insert_rowid()?;
    debug!(zone_id, lane_id, name, direction = direction.as_str(), "Created lane");
    reload(get_lane(conn, lane_id)?, "lane", lane_id)
}

/// Replaces a lane's name and direction.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the lane does not exist, or
/// `PersistenceError::NameConflict` if the name is taken within its zone.
pub fn update_lane(
    conn: &mut SqliteConnection,
    lane_id: i64,
    name: &str,
    direction: LaneDirection,
) -> Result<Lane, PersistenceError> {
    let affected: usize = diesel::update(lanes::table.filter(lanes::lane_id.eq(lane_id)))
        .set((lanes::name.eq(name), lanes::direction.eq(direction.as_str())))
        .execute(conn)
        .map_err(PersistenceError::on_unique("lane", name))?;
    expect_affected(affected, "lane", lane_id)?;
    reload(get_lane(conn, lane_id)?, "lane", lane_id)
}

/// Deletes a lane. Devices on it are detached.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the lane does not exist.
pub fn delete_lane(conn: &mut SqliteConnection, lane_id: i64) -> Result<(), PersistenceError> {
    let affected: usize =
        diesel::delete(lanes::table.filter(lanes::lane_id.eq(lane_id))).execute(conn)?;
    expect_affected(affected, "lane", lane_id)?;
    debug!(lane_id, "Deleted lane");
    Ok(())
}

/// Creates a device controller, optionally already linked to a site.
///
/// # Errors
///
/// Returns `PersistenceError::ParentNotFound` if the site does not exist, or
/// `PersistenceError::NameConflict` if the controller name is taken.
pub fn create_controller(
    conn: &mut SqliteConnection,
    site_id: Option<i64>,
    name: &str,
    host: &str,
    port: u16,
) -> Result<DeviceController, PersistenceError> {
    check_site_exists(conn, site_id)?;
    diesel::insert_into(device_controllers::table)
        .values((
            device_controllers::site_id.eq(site_id),
            device_controllers::name.eq(name),
            device_controllers::host.eq(host),
            device_controllers::port.eq(i32::from(port)),
            device_controllers::created_at.eq(now_timestamp()?),
        ))
        .execute(conn)
        .map_err(PersistenceError::on_unique("device controller", name))?;

    let controller_id: i64 = conn.get_last_insert_rowid()?;
    debug!(controller_id, name, host, port, "Created device controller");
    reload(
        get_controller(conn, controller_id)?,
        "device controller",
        controller_id,
    )
}

/// Replaces a controller's name and address. Its site link only changes
/// through [`toggle_controller_site`].
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the controller does not exist, or
/// `PersistenceError::NameConflict` if the name is taken.
pub fn update_controller(
    conn: &mut SqliteConnection,
    controller_id: i64,
    name: &str,
    host: &str,
    port: u16,
) -> Result<DeviceController, PersistenceError> {
    let affected: usize = diesel::update(
        device_controllers::table.filter(device_controllers::controller_id.eq(controller_id)),
    )
    .set((
        device_controllers::name.eq(name),
        device_controllers::host.eq(host),
        device_controllers::port.eq(i32::from(port)),
    ))
    .execute(conn)
    .map_err(PersistenceError::on_unique("device controller", name))?;
    expect_affected(affected, "device controller", controller_id)?;
    reload(
        get_controller(conn, controller_id)?,
        "device controller",
        controller_id,
    )
}

/// Deletes a controller. Devices it drove are detached.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the controller does not exist.
pub fn delete_controller(
    conn: &mut SqliteConnection,
    controller_id: i64,
) -> Result<(), PersistenceError> {
    let affected: usize = diesel::delete(
        device_controllers::table.filter(device_controllers::controller_id.eq(controller_id)),
    )
    .execute(conn)?;
    expect_affected(affected, "device controller", controller_id)?;
    debug!(controller_id, "Deleted device controller");
    Ok(())
}

/// Clears the controller link of devices outside `owner_site_id`.
///
/// Returns the detached device ids in ascending order.
fn detach_foreign_devices(
    conn: &mut SqliteConnection,
    controller_id: i64,
    owner_site_id: i64,
) -> Result<Vec<i64>, PersistenceError> {
    let device_ids: Vec<i64> = devices::table
        .filter(devices::controller_id.eq(controller_id))
        .filter(devices::site_id.ne(owner_site_id))
        .select(devices::device_id)
        .order(devices::device_id.asc())
        .load(conn)?;
    if !device_ids.is_empty() {
        diesel::update(devices::table.filter(devices::device_id.eq_any(&device_ids)))
            .set(devices::controller_id.eq(None::<i64>))
            .execute(conn)?;
    }
    Ok(device_ids)
}

/// Flips a controller's link to `site_id`.
///
/// A controller linked to `site_id` is released; any other controller is
/// claimed by it, including one currently held by another site. Taking a
/// controller from another site detaches that site's devices from it, is
/// logged at warn level and names the detached devices in the audit event.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the site or the controller does
/// not exist.
pub fn toggle_controller_site(
    conn: &mut SqliteConnection,
    site_id: i64,
    controller_id: i64,
    actor: Actor,
    cause: Cause,
) -> Result<ControllerToggleOutcome, PersistenceError> {
    conn.immediate_transaction(|conn| {
        require_site(conn, site_id)?;
        let controller: DeviceController = reload(
            get_controller(conn, controller_id)?,
            "device controller",
            controller_id,
        )?;

        let mut claim = apply_controller_toggle(&controller, site_id, actor, cause);

        diesel::update(
            device_controllers::table.filter(device_controllers::controller_id.eq(controller_id)),
        )
        .set(device_controllers::site_id.eq(claim.new_site_id))
        .execute(conn)?;

        if claim.toggle.is_steal() {
            let detached: Vec<i64> = detach_foreign_devices(conn, controller_id, site_id)?;
            warn!(
                controller_id,
                from_site = ?controller.site_id,
                to_site = site_id,
                detached_devices = detached.len(),
                "Device controller taken from another site"
            );
            if !detached.is_empty() {
                let ids: Vec<String> = detached.iter().map(ToString::to_string).collect();
                let note: String = format!("detached devices {}", ids.join(", "));
                let details: String = claim
                    .audit_event
                    .action
                    .details
                    .take()
                    .map_or_else(|| note.clone(), |details| format!("{details}; {note}"));
                claim.audit_event.action.details = Some(details);
            }
        } else {
            info!(
                controller_id,
                site_id,
                linked = claim.new_site_id.is_some(),
                "Toggled device controller"
            );
        }

        let event_id: i64 = persist_audit_event(conn, &claim.audit_event)?;
        let controller: DeviceController = reload(
            get_controller(conn, controller_id)?,
            "device controller",
            controller_id,
        )?;
        Ok(ControllerToggleOutcome {
            controller,
            toggle: claim.toggle,
            event_id,
        })
    })
}

fn check_lane_in_site(
    conn: &mut SqliteConnection,
    site_id: i64,
    lane_id: Option<i64>,
) -> Result<(), PersistenceError> {
    let Some(lane_id) = lane_id else {
        return Ok(());
    };
    match lane_site_id(conn, lane_id)? {
        Some(owner) if owner == site_id => Ok(()),
        _ => Err(PersistenceError::ParentNotFound {
            entity: "lane",
            id: lane_id,
        }),
    }
}

fn check_site_exists(
    conn: &mut SqliteConnection,
    site_id: Option<i64>,
) -> Result<(), PersistenceError> {
    let Some(site_id) = site_id else {
        return Ok(());
    };
    if get_site(conn, site_id)?.is_none() {
        return Err(PersistenceError::ParentNotFound {
            entity: "site",
            id: site_id,
        });
    }
    Ok(())
}

fn check_controller_exists(
    conn: &mut SqliteConnection,
    controller_id: Option<i64>,
) -> Result<(), PersistenceError> {
    let Some(controller_id) = controller_id else {
        return Ok(());
    };
    if get_controller(conn, controller_id)?.is_none() {
        return Err(PersistenceError::ParentNotFound {
            entity: "device controller",
            id: controller_id,
        });
    }
    Ok(())
}

/// Creates a device within a site.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `site_id` - The owning site
/// * `lane_id` - Optional lane, which must belong to `site_id`
/// * `controller_id` - Optional controller driving the device
/// * `name` - Validated name, unique within the site
/// * `kind` - The device kind
///
/// # Errors
///
/// Returns `PersistenceError::ParentNotFound` if the site, lane or controller
/// does not exist (a lane of another site counts as missing), or
/// `PersistenceError::NameConflict` if the name is taken within the site.
pub fn create_device(
    conn: &mut SqliteConnection,
    site_id: i64,
    lane_id: Option<i64>,
    controller_id: Option<i64>,
    name: &str,
    kind: DeviceKind,
) -> Result<Device, PersistenceError> {
    conn.immediate_transaction(|conn| {
        check_site_exists(conn, Some(site_id))?;
        check_lane_in_site(conn, site_id, lane_id)?;
        check_controller_exists(conn, controller_id)?;

        diesel::insert_into(devices::table)
            .values((
                devices::site_id.eq(site_id),
                devices::lane_id.eq(lane_id),
                devices::controller_id.eq(controller_id),
                devices::name.eq(name),
                devices::kind.eq(kind.as_str()),
                devices::created_at.eq(now_timestamp()?),
            ))
            .execute(conn)
            .map_err(PersistenceError::on_unique("device", name))?;

        let device_id: i64 = conn.get_last_insert_rowid()?;
        debug!(site_id, device_id, name, kind = kind.as_str(), "Created device");
        reload(get_device(conn, device_id)?, "device", device_id)
    })
}

/// Replaces a device's lane, controller, name and kind.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the device does not exist,
/// `PersistenceError::ParentNotFound` for a missing or foreign lane or a
/// missing controller, or `PersistenceError::NameConflict` if the name is
/// taken within the site.
pub fn update_device(
    conn: &mut SqliteConnection,
    device_id: i64,
    lane_id: Option<i64>,
    controller_id: Option<i64>,
    name: &str,
    kind: DeviceKind,
) -> Result<Device, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let device: Device = reload(get_device(conn, device_id)?, "device", device_id)?;
        check_lane_in_site(conn, device.site_id, lane_id)?;
        check_controller_exists(conn, controller_id)?;

        diesel::update(devices::table.filter(devices::device_id.eq(device_id)))
            .set((
                devices::lane_id.eq(lane_id),
                devices::controller_id.eq(controller_id),
                devices::name.eq(name),
                devices::kind.eq(kind.as_str()),
            ))
            .execute(conn)
            .map_err(PersistenceError::on_unique("device", name))?;
        reload(get_device(conn, device_id)?, "device", device_id)
    })
}

/// Deletes a device.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the device does not exist.
pub fn delete_device(conn: &mut SqliteConnection, device_id: i64) -> Result<(), PersistenceError> {
    let affected: usize =
        diesel::delete(devices::table.filter(devices::device_id.eq(device_id))).execute(conn)?;
    expect_affected(affected, "device", device_id)?;
    debug!(device_id, "Deleted device");
    Ok(())
}

/// Makes `device_ids` the exact device set of a lane.
///
/// Devices currently on the lane but not listed are detached. An empty list
/// detaches everything. The whole assignment rolls back if any listed device
/// is missing or belongs to another site.
///
/// # Errors
///
/// Returns `PersistenceError::ParentNotFound` if the lane does not exist, or
/// `PersistenceError::NotFound` for the first listed device that cannot be
/// attached.
pub fn assign_devices_to_lane(
    conn: &mut SqliteConnection,
    lane_id: i64,
    device_ids: &[i64],
) -> Result<Vec<Device>, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let site_id: i64 = lane_site_id(conn, lane_id)?.ok_or(PersistenceError::ParentNotFound {
            entity: "lane",
            id: lane_id,
        })?;

        let detached: usize = diesel::update(devices::table.filter(devices::lane_id.eq(lane_id)))
            .set(devices::lane_id.eq(None::<i64>))
            .execute(conn)?;

        for &device_id in device_ids {
            let attached: usize = diesel::update(
                devices::table
                    .filter(devices::device_id.eq(device_id))
                    .filter(devices::site_id.eq(site_id)),
            )
            .set(devices::lane_id.eq(Some(lane_id)))
            .execute(conn)?;
            expect_affected(attached, "device", device_id)?;
        }

        info!(
            lane_id,
            site_id,
            detached,
            assigned = device_ids.len(),
            "Assigned devices to lane"
        );
        list_lane_devices(conn, lane_id)
    })
}
