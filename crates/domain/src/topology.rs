// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Site → Zone → Lane → Device ownership tree and device controllers.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// A physical parking facility. All other configuration is scoped to a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Canonical identifier.
    pub site_id: i64,
    /// Unique display name.
    pub name: String,
    /// IANA timezone used to resolve the site's calendar day.
    pub timezone: String,
    /// Optional street address.
    pub address: Option<String>,
}

/// A named area of a site (a floor, an outdoor lot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Canonical identifier.
    pub zone_id: i64,
    /// Owning site.
    pub site_id: i64,
    /// Name, unique within the site.
    pub name: String,
}

/// Traffic direction served by a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaneDirection {
    /// Vehicles enter through this lane.
    Entry,
    /// Vehicles leave through this lane.
    Exit,
    /// Both directions.
    #[default]
    Both,
}

impl LaneDirection {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "ENTRY",
            Self::Exit => "EXIT",
            Self::Both => "BOTH",
        }
    }
}

impl FromStr for LaneDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENTRY" => Ok(Self::Entry),
            "EXIT" => Ok(Self::Exit),
            "BOTH" => Ok(Self::Both),
            _ => Err(DomainError::InvalidLaneDirection(s.to_string())),
        }
    }
}

impl std::fmt::Display for LaneDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A lane within a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    /// Canonical identifier.
    pub lane_id: i64,
    /// Owning zone.
    pub zone_id: i64,
    /// Name, unique within the zone.
    pub name: String,
    /// Traffic direction.
    pub direction: LaneDirection,
}

/// Kind of field device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceKind {
    /// Plate-recognition camera at an entry lane.
    EntryCamera,
    /// Plate-recognition camera at an exit lane.
    ExitCamera,
    /// Message display board.
    Display,
    /// Gate barrier.
    Barrier,
    /// Loop or presence sensor.
    Sensor,
}

impl DeviceKind {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EntryCamera => "ENTRY_CAMERA",
            Self::ExitCamera => "EXIT_CAMERA",
            Self::Display => "DISPLAY",
            Self::Barrier => "BARRIER",
            Self::Sensor => "SENSOR",
        }
    }
}

impl FromStr for DeviceKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENTRY_CAMERA" => Ok(Self::EntryCamera),
            "EXIT_CAMERA" => Ok(Self::ExitCamera),
            "DISPLAY" => Ok(Self::Display),
            "BARRIER" => Ok(Self::Barrier),
            "SENSOR" => Ok(Self::Sensor),
            _ => Err(DomainError::InvalidDeviceKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A network controller that fronts a group of devices.
///
/// Controllers form a global pool; `site_id` records which site currently
/// claims the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceController {
    /// Canonical identifier.
    pub controller_id: i64,
    /// Site currently holding the controller, if any.
    pub site_id: Option<i64>,
    /// Globally unique name.
    pub name: String,
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// A field device belonging to a site and optionally mounted on one lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Canonical identifier.
    pub device_id: i64,
    /// Owning site.
    pub site_id: i64,
    /// Lane the device is attached to.
    pub lane_id: Option<i64>,
    /// Controller the device is wired to.
    pub controller_id: Option<i64>,
    /// Name, unique within the site.
    pub name: String,
    /// Device kind.
    pub kind: DeviceKind,
}

/// A lane with its attached devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneNode {
    /// The lane.
    pub lane: Lane,
    /// Devices attached to the lane.
    pub devices: Vec<Device>,
}

/// A zone with its lanes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneNode {
    /// The zone.
    pub zone: Zone,
    /// Lanes in the zone.
    pub lanes: Vec<LaneNode>,
}

/// The full nested configuration graph of one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteTree {
    /// The site.
    pub site: Site,
    /// Controllers claimed by the site.
    pub controllers: Vec<DeviceController>,
    /// Zones with lanes and devices.
    pub zones: Vec<ZoneNode>,
    /// Site devices not attached to any lane.
    pub unassigned_devices: Vec<Device>,
}

impl SiteTree {
    /// Assembles the nested graph from flat rows.
    ///
    /// Rows that do not belong to the site (or whose parent is absent from
    /// the input) are ignored. Input order is preserved within each level.
    #[must_use]
    pub fn assemble(
        site: Site,
        controllers: Vec<DeviceController>,
        zones: Vec<Zone>,
        lanes: Vec<Lane>,
        devices: Vec<Device>,
    ) -> Self {
        let site_id: i64 = site.site_id;

        let mut devices_by_lane: HashMap<i64, Vec<Device>> = HashMap::new();
        let mut unassigned_devices: Vec<Device> = Vec::new();
        for device in devices.into_iter().filter(|d| d.site_id == site_id) {
            match device.lane_id {
                Some(lane_id) => devices_by_lane.entry(lane_id).or_default().push(device),
                None => unassigned_devices.push(device),
            }
        }

        let mut lanes_by_zone: HashMap<i64, Vec<LaneNode>> = HashMap::new();
        for lane in lanes {
            let devices: Vec<Device> = devices_by_lane.remove(&lane.lane_id).unwrap_or_default();
            lanes_by_zone
                .entry(lane.zone_id)
                .or_default()
                .push(LaneNode { lane, devices });
        }

        // Devices pointing at lanes outside this site are shown as unassigned.
        let mut orphaned: Vec<Device> = devices_by_lane.into_values().flatten().collect();
        orphaned.sort_by_key(|d| d.device_id);
        unassigned_devices.extend(orphaned);

        let zones: Vec<ZoneNode> = zones
            .into_iter()
            .filter(|z| z.site_id == site_id)
            .map(|zone| ZoneNode {
                lanes: lanes_by_zone.remove(&zone.zone_id).unwrap_or_default(),
                zone,
            })
            .collect();

        let controllers: Vec<DeviceController> = controllers
            .into_iter()
            .filter(|c| c.site_id == Some(site_id))
            .collect();

        Self {
            site,
            controllers,
            zones,
            unassigned_devices,
        }
    }
}

/// Outcome of toggling a controller's site relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerToggle {
    /// The controller was linked to the caller's site and is now unlinked.
    Released,
    /// The controller is now linked to the caller's site.
    Claimed {
        /// The site it was taken from, if it belonged to another site.
        previous_site_id: Option<i64>,
    },
}

impl ControllerToggle {
    /// The controller's site after the toggle.
    #[must_use]
    pub const fn resulting_site_id(&self, caller_site_id: i64) -> Option<i64> {
        match self {
            Self::Released => None,
            Self::Claimed { .. } => Some(caller_site_id),
        }
    }

    /// True when the toggle took the controller away from a different site.
    #[must_use]
    pub const fn is_steal(&self) -> bool {
        matches!(
            self,
            Self::Claimed {
                previous_site_id: Some(_)
            }
        )
    }
}

/// Decides how a controller's site link flips.
///
/// Linked to the caller's site → released. Otherwise the caller claims it,
/// taking it from whichever site held it. No ownership check is made.
#[must_use]
pub const fn resolve_controller_toggle(
    current_site_id: Option<i64>,
    caller_site_id: i64,
) -> ControllerToggle {
    match current_site_id {
        Some(current) if current == caller_site_id => ControllerToggle::Released,
        other => ControllerToggle::Claimed {
            previous_site_id: other,
        },
    }
}
