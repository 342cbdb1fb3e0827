// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Topology queries: sites, zones, lanes, controllers and devices.

use diesel::SqliteConnection;
use diesel::prelude::*;
use num_traits::ToPrimitive;
use parkops_domain::{
    Device, DeviceController, DeviceKind, Lane, LaneDirection, Site, SiteTree, Zone,
};
use tracing::debug;

use crate::diesel_schema::{device_controllers, devices, lanes, sites, zones};
use crate::error::PersistenceError;

/// Diesel Queryable struct for site rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = sites)]
pub(crate) struct SiteRow {
    site_id: i64,
    name: String,
    timezone: String,
    address: Option<String>,
}

impl From<SiteRow> for Site {
    fn from(row: SiteRow) -> Self {
        Self {
            site_id: row.site_id,
            name: row.name,
            timezone: row.timezone,
            address: row.address,
        }
    }
}

/// Diesel Queryable struct for zone rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = zones)]
pub(crate) struct ZoneRow {
    zone_id: i64,
    site_id: i64,
    name: String,
}

impl From<ZoneRow> for Zone {
    fn from(row: ZoneRow) -> Self {
        Self {
            zone_id: row.zone_id,
            site_id: row.site_id,
            name: row.name,
        }
    }
}

/// Diesel Queryable struct for lane rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = lanes)]
pub(crate) struct LaneRow {
    lane_id: i64,
    zone_id: i64,
    name: String,
    direction: String,
}

impl TryFrom<LaneRow> for Lane {
    type Error = PersistenceError;

    fn try_from(row: LaneRow) -> Result<Self, Self::Error> {
        Ok(Self {
            lane_id: row.lane_id,
            zone_id: row.zone_id,
            name: row.name,
            direction: row
                .direction
                .parse::<LaneDirection>()
                .map_err(|e| PersistenceError::corrupt(&e))?,
        })
    }
}

/// Diesel Queryable struct for controller rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = device_controllers)]
pub(crate) struct ControllerRow {
    controller_id: i64,
    site_id: Option<i64>,
    name: String,
    host: String,
    port: i32,
}

impl TryFrom<ControllerRow> for DeviceController {
    type Error = PersistenceError;

    fn try_from(row: ControllerRow) -> Result<Self, Self::Error> {
        let port: u16 = row.port.to_u16().ok_or_else(|| {
            PersistenceError::CorruptRow(format!(
                "controller {} has port {}",
                row.controller_id, row.port
            ))
        })?;
        Ok(Self {
            controller_id: row.controller_id,
            site_id: row.site_id,
            name: row.name,
            host: row.host,
            port,
        })
    }
}

/// Diesel Queryable struct for device rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = devices)]
pub(crate) struct DeviceRow {
    device_id: i64,
    site_id: i64,
    lane_id: Option<i64>,
    controller_id: Option<i64>,
    name: String,
    kind: String,
}

impl TryFrom<DeviceRow> for Device {
    type Error = PersistenceError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            device_id: row.device_id,
            site_id: row.site_id,
            lane_id: row.lane_id,
            controller_id: row.controller_id,
            name: row.name,
            kind: row
                .kind
                .parse::<DeviceKind>()
                .map_err(|e| PersistenceError::corrupt(&e))?,
        })
    }
}

/// Retrieves a site by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
/// Returns `Ok(None)` if the site is not found.
pub fn get_site(
    conn: &mut SqliteConnection,
    site_id: i64,
) -> Result<Option<Site>, PersistenceError> {
    debug!(site_id, "Looking up site");
    let row: Option<SiteRow> = sites::table
        .filter(sites::site_id.eq(site_id))
        .select(SiteRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row.map(Site::from))
}

/// Retrieves a site by ID, failing when it does not exist.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the site is not found.
pub fn require_site(conn: &mut SqliteConnection, site_id: i64) -> Result<Site, PersistenceError> {
    get_site(conn, site_id)?.ok_or(PersistenceError::NotFound {
        entity: "site",
        id: site_id,
    })
}

/// Lists all sites ordered by name.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_sites(conn: &mut SqliteConnection) -> Result<Vec<Site>, PersistenceError> {
    let rows: Vec<SiteRow> = sites::table
        .select(SiteRow::as_select())
        .order((sites::name.asc(), sites::site_id.asc()))
        .load(conn)?;
    Ok(rows.into_iter().map(Site::from).collect())
}

/// Retrieves a zone by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_zone(
    conn: &mut SqliteConnection,
    zone_id: i64,
) -> Result<Option<Zone>, PersistenceError> {
    let row: Option<ZoneRow> = zones::table
        .filter(zones::zone_id.eq(zone_id))
        .select(ZoneRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row.map(Zone::from))
}

/// Lists the zones of a site.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_zones(
    conn: &mut SqliteConnection,
    site_id: i64,
) -> Result<Vec<Zone>, PersistenceError> {
    let rows: Vec<ZoneRow> = zones::table
        .filter(zones::site_id.eq(site_id))
        .select(ZoneRow::as_select())
        .order(zones::zone_id.asc())
        .load(conn)?;
    Ok(rows.into_iter().map(Zone::from).collect())
}

/// Retrieves a lane by ID.
///
/// # Errors
///
/// Returns an error if the database query fails or the row is corrupt.
pub fn get_lane(
    conn: &mut SqliteConnection,
    lane_id: i64,
) -> Result<Option<Lane>, PersistenceError> {
    let row: Option<LaneRow> = lanes::table
        .filter(lanes::lane_id.eq(lane_id))
        .select(LaneRow::as_select())
        .first(conn)
        .optional()?;
    row.map(Lane::try_from).transpose()
}

/// Returns the site owning a lane, via its zone.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn lane_site_id(
    conn: &mut SqliteConnection,
    lane_id: i64,
) -> Result<Option<i64>, PersistenceError> {
    Ok(lanes::table
        .inner_join(zones::table)
        .filter(lanes::lane_id.eq(lane_id))
        .select(zones::site_id)
        .first::<i64>(conn)
        .optional()?)
}

/// Lists the lanes of a zone.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_lanes(
    conn: &mut SqliteConnection,
    zone_id: i64,
) -> Result<Vec<Lane>, PersistenceError> {
    let rows: Vec<LaneRow> = lanes::table
        .filter(lanes::zone_id.eq(zone_id))
        .select(LaneRow::as_select())
        .order(lanes::lane_id.asc())
        .load(conn)?;
    rows.into_iter().map(Lane::try_from).collect()
}

/// Lists every lane of a site across its zones.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_site_lanes(
    conn: &mut SqliteConnection,
    site_id: i64,
) -> Result<Vec<Lane>, PersistenceError> {
    let rows: Vec<LaneRow> = lanes::table
        .inner_join(zones::table)
        .filter(zones::site_id.eq(site_id))
        .select(LaneRow::as_select())
        .order(lanes::lane_id.asc())
        .load(conn)?;
    rows.into_iter().map(Lane::try_from).collect()
}

/// Retrieves a device controller by ID.
///
/// # Errors
///
/// Returns an error if the database query fails or the row is corrupt.
pub fn get_controller(
    conn: &mut SqliteConnection,
    controller_id: i64,
) -> Result<Option<DeviceController>, PersistenceError> {
    let row: Option<ControllerRow> = device_controllers::table
        .filter(device_controllers::controller_id.eq(controller_id))
        .select(ControllerRow::as_select())
        .first(conn)
        .optional()?;
    row.map(DeviceController::try_from).transpose()
}

/// Lists device controllers, optionally only those no site has claimed.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_controllers(
    conn: &mut SqliteConnection,
    unassigned_only: bool,
) -> Result<Vec<DeviceController>, PersistenceError> {
    let mut query = device_controllers::table
        .select(ControllerRow::as_select())
        .order(device_controllers::controller_id.asc())
        .into_boxed();
    if unassigned_only {
        query = query.filter(device_controllers::site_id.is_null());
    }
    let rows: Vec<ControllerRow> = query.load(conn)?;
    rows.into_iter().map(DeviceController::try_from).collect()
}

fn list_site_controllers(
    conn: &mut SqliteConnection,
    site_id: i64,
) -> Result<Vec<DeviceController>, PersistenceError> {
    let rows: Vec<ControllerRow> = device_controllers::table
        .filter(device_controllers::site_id.eq(site_id))
        .select(ControllerRow::as_select())
        .order(device_controllers::controller_id.asc())
        .load(conn)?;
    rows.into_iter().map(DeviceController::try_from).collect()
}

/// Retrieves a device by ID.
///
/// # Errors
///
/// Returns an error if the database query fails or the row is corrupt.
pub fn get_device(
    conn: &mut SqliteConnection,
    device_id: i64,
) -> Result<Option<Device>, PersistenceError> {
    let row: Option<DeviceRow> = devices::table
        .filter(devices::device_id.eq(device_id))
        .select(DeviceRow::as_select())
        .first(conn)
        .optional()?;
    row.map(Device::try_from).transpose()
}

/// Lists the devices of a site.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_devices(
    conn: &mut SqliteConnection,
    site_id: i64,
) -> Result<Vec<Device>, PersistenceError> {
    let rows: Vec<DeviceRow> = devices::table
        .filter(devices::site_id.eq(site_id))
        .select(DeviceRow::as_select())
        .order(devices::device_id.asc())
        .load(conn)?;
    rows.into_iter().map(Device::try_from).collect()
}

/// Lists the devices attached to a lane.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_lane_devices(
    conn: &mut SqliteConnection,
    lane_id: i64,
) -> Result<Vec<Device>, PersistenceError> {
    let rows: Vec<DeviceRow> = devices::table
        .filter(devices::lane_id.eq(lane_id))
        .select(DeviceRow::as_select())
        .order(devices::device_id.asc())
        .load(conn)?;
    rows.into_iter().map(Device::try_from).collect()
}

/// Loads the full configuration graph of a site.
///
/// # Errors
///
/// Returns an error if the database query fails.
/// Returns `Ok(None)` if the site is not found.
pub fn find_site_tree(
    conn: &mut SqliteConnection,
    site_id: i64,
) -> Result<Option<SiteTree>, PersistenceError> {
    let Some(site) = get_site(conn, site_id)? else {
        return Ok(None);
    };
    let controllers: Vec<DeviceController> = list_site_controllers(conn, site_id)?;
    let zones: Vec<Zone> = list_zones(conn, site_id)?;
    let lanes: Vec<Lane> = list_site_lanes(conn, site_id)?;
    let devices: Vec<Device> = list_devices(conn, site_id)?;

    debug!(
        site_id,
        zones = zones.len(),
        lanes = lanes.len(),
        devices = devices.len(),
        "Assembled site tree"
    );
    Ok(Some(SiteTree::assemble(
        site,
        controllers,
        zones,
        lanes,
        devices,
    )))
}
