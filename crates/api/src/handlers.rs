// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API handler functions for state-changing and read-only operations.
//!
//! Handlers validate raw request data into domain values, call the
//! persistence layer and translate results into response DTOs. Operations
//! that write an audit event take the `Actor` and `Cause` to record.
//! Operations that default a time or a calendar day take `now`.

use parkops::Command;
use parkops_audit::{Actor, Cause};
use parkops_domain::{
    AppliedDiscount, ControllerToggle, DeviceKind, EventSource, LaneContext, LaneDirection,
    NewPolicy, NewSession, PageRequest, Policy, PolicyFilter, PolicySort, PolicyType,
    PolicyUpdate, SessionFilter, SessionPatch, SessionStatus, Site, SortDirection, format_date,
    local_date, local_day_start, normalize_car_number, parse_date, parse_timestamp,
    validate_amount, validate_name, validate_optional_text, validate_period, validate_port,
    validate_timezone,
};
use parkops_persistence::{Persistence, SessionTransition};
use std::str::FromStr;
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::request_response::{
    ActiveSessionResponse, AppliedDiscountInfo, AssignDevicesRequest, AssignDevicesResponse,
    AuditEventInfo, CarNumberQuery, CloseSessionRequest, ControllerInfo, CreateControllerRequest,
    CreatePaymentRequest, CreatePolicyRequest, CreateSiteRequest, DeviceInfo, DeviceRequest,
    EffectiveMembershipInfo, EffectiveMembershipQuery, EffectiveMembershipResponse, HolidayInfo,
    HolidayRequest, IsHolidayQuery, IsHolidayResponse, LaneEventRequest, LaneInfo, LaneRequest,
    ListAuditEventsResponse, ListControllersQuery, ListControllersResponse, ListDevicesResponse,
    ListHolidaysQuery, ListHolidaysResponse, ListLanesResponse, ListMembersResponse,
    ListPaymentsResponse, ListPoliciesQuery, ListPoliciesResponse, ListSessionsQuery,
    ListSessionsResponse, ListSitesResponse, ListZonesResponse, MemberInfo, MemberRequest,
    OpenSessionRequest, PageQuery, PaymentInfo, PolicyInfo, ResetPoliciesRequest,
    ResetPoliciesResponse, SelectBlacklistRequest, SelectBlacklistResponse,
    SelectedBlacklistResponse, SessionInfo, SessionTransitionResponse, SiteInfo,
    SiteTreeResponse, StatisticsQuery, StatisticsResponse, ToggleControllerResponse,
    UpdateControllerRequest, UpdatePolicyRequest, UpdateSessionRequest, UpdateSiteRequest,
    ZoneInfo, ZoneRequest,
};

/// Timezone given to sites created without one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

fn not_found(resource_type: &str, id: i64) -> ApiError {
    ApiError::ResourceNotFound {
        resource_type: resource_type.to_string(),
        message: format!("{resource_type} {id} does not exist"),
    }
}

/// Loads a site or reports it missing.
fn require_site(persistence: &mut Persistence, site_id: i64) -> Result<Site, ApiError> {
    persistence
        .get_site(site_id)?
        .ok_or_else(|| not_found("Site", site_id))
}

/// The requested day, or the site's current calendar day when none is given.
fn resolve_day(site: &Site, value: Option<&str>, now: OffsetDateTime) -> Result<Date, ApiError> {
    let date: Date = match value {
        Some(raw) => parse_date(raw)?,
        None => local_date(&site.timezone, now)?,
    };
    Ok(date)
}

fn page_request(page: Option<u32>, per_page: Option<u32>) -> Result<PageRequest, ApiError> {
    Ok(PageRequest::new(page, per_page)?)
}

/// Builds a lane context, defaulting the time to `now` and the source to
/// `CAMERA`.
fn lane_context(request: &LaneEventRequest, now: OffsetDateTime) -> Result<LaneContext, ApiError> {
    let time: OffsetDateTime = request
        .time
        .as_deref()
        .map(parse_timestamp)
        .transpose()?
        .unwrap_or(now);
    let source: EventSource = request
        .source
        .as_deref()
        .map(EventSource::from_str)
        .transpose()?
        .unwrap_or_default();
    Ok(LaneContext {
        zone_id: request.zone_id,
        lane_id: request.lane_id,
        time,
        image_url: validate_optional_text("image_url", request.image_url.as_deref())?,
        source,
    })
}

fn policy_info(policy: &Policy) -> Result<PolicyInfo, ApiError> {
    Ok(PolicyInfo::try_from(policy)?)
}

fn new_policy(site_id: i64, request: &CreatePolicyRequest) -> Result<NewPolicy, ApiError> {
    let policy_type: PolicyType = PolicyType::from_str(&request.policy_type)?;
    Ok(NewPolicy::new(
        site_id,
        policy_type,
        &request.name,
        request.code.as_deref(),
        request.config.clone(),
        request.is_system,
    )?)
}

fn transition_response(transition: &SessionTransition) -> SessionTransitionResponse {
    SessionTransitionResponse {
        session: SessionInfo::from(&transition.session),
        event_id: transition.event_id,
    }
}

// ============================================================================
// Sites
// ============================================================================

/// Creates a site.
///
/// The timezone defaults to `UTC` and must be a known IANA identifier.
///
/// # Errors
///
/// Returns an error if:
/// - The name, timezone or address is invalid
/// - Another site already uses the name
pub fn create_site(
    persistence: &mut Persistence,
    request: &CreateSiteRequest,
) -> Result<SiteInfo, ApiError> {
    let name: String = validate_name("site", &request.name)?;
    let timezone: &str = request.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE);
    validate_timezone(timezone)?;
    let address: Option<String> = validate_optional_text("address", request.address.as_deref())?;

    let site = persistence.create_site(&name, timezone, address.as_deref())?;
    info!(site_id = site.site_id, name = %site.name, "Created site");
    Ok(SiteInfo::from(&site))
}

/// Replaces a site's name, timezone and address.
///
/// # Errors
///
/// Returns an error if the site does not exist, a field is invalid, or the
/// new name is taken.
pub fn update_site(
    persistence: &mut Persistence,
    site_id: i64,
    request: &UpdateSiteRequest,
) -> Result<SiteInfo, ApiError> {
    let name: String = validate_name("site", &request.name)?;
    validate_timezone(&request.timezone)?;
    let address: Option<String> = validate_optional_text("address", request.address.as_deref())?;

    let site = persistence.update_site(site_id, &name, &request.timezone, address.as_deref())?;
    info!(site_id, "Updated site");
    Ok(SiteInfo::from(&site))
}

/// Deletes a site with its zones, lanes, devices, policies, holidays,
/// members and sessions. Controllers it held are released.
///
/// # Errors
///
/// Returns an error if the site does not exist.
pub fn delete_site(persistence: &mut Persistence, site_id: i64) -> Result<(), ApiError> {
    persistence.delete_site(site_id)?;
    info!(site_id, "Deleted site");
    Ok(())
}

/// Retrieves a site.
///
/// # Errors
///
/// Returns an error if the site does not exist.
pub fn get_site(persistence: &mut Persistence, site_id: i64) -> Result<SiteInfo, ApiError> {
    let site: Site = require_site(persistence, site_id)?;
    Ok(SiteInfo::from(&site))
}

/// Lists all sites.
///
/// # Errors
///
/// Returns an error if the database cannot be queried.
pub fn list_sites(persistence: &mut Persistence) -> Result<ListSitesResponse, ApiError> {
    let sites = persistence.list_sites()?;
    Ok(ListSitesResponse {
        sites: sites.iter().map(SiteInfo::from).collect(),
    })
}

/// Retrieves the full configuration graph of a site.
///
/// # Errors
///
/// Returns an error if the site does not exist.
pub fn get_site_tree(
    persistence: &mut Persistence,
    site_id: i64,
) -> Result<SiteTreeResponse, ApiError> {
    let tree = persistence
        .find_site_tree(site_id)?
        .ok_or_else(|| not_found("Site", site_id))?;
    debug!(
        site_id,
        zones = tree.zones.len(),
        unassigned = tree.unassigned_devices.len(),
        "Loaded site tree"
    );
    Ok(SiteTreeResponse::from(&tree))
}

// ============================================================================
// Zones & Lanes
// ============================================================================

/// Creates a zone in a site.
///
/// # Errors
///
/// Returns an error if the name is invalid or taken within the site, or the
/// site does not exist.
pub fn create_zone(
    persistence: &mut Persistence,
    site_id: i64,
    request: &ZoneRequest,
) -> Result<ZoneInfo, ApiError> {
    let name: String = validate_name("zone", &request.name)?;
    let zone = persistence.create_zone(site_id, &name)?;
    info!(site_id, zone_id = zone.zone_id, "Created zone");
    Ok(ZoneInfo::from(&zone))
}

/// Renames a zone.
///
/// # Errors
///
/// Returns an error if the zone does not exist or the name is invalid or
/// taken.
pub fn update_zone(
    persistence: &mut Persistence,
    zone_id: i64,
    request: &ZoneRequest,
) -> Result<ZoneInfo, ApiError> {
    let name: String = validate_name("zone", &request.name)?;
    let zone = persistence.update_zone(zone_id, &name)?;
    info!(zone_id, "Updated zone");
    Ok(ZoneInfo::from(&zone))
}

/// Deletes a zone with its lanes. Devices on those lanes are detached.
///
/// # Errors
///
/// Returns an error if the zone does not exist.
pub fn delete_zone(persistence: &mut Persistence, zone_id: i64) -> Result<(), ApiError> {
    persistence.delete_zone(zone_id)?;
    info!(zone_id, "Deleted zone");
    Ok(())
}

/// Retrieves a zone.
///
/// # Errors
///
/// Returns an error if the zone does not exist.
pub fn get_zone(persistence: &mut Persistence, zone_id: i64) -> Result<ZoneInfo, ApiError> {
    let zone = persistence
        .get_zone(zone_id)?
        .ok_or_else(|| not_found("Zone", zone_id))?;
    Ok(ZoneInfo::from(&zone))
}

/// Lists a site's zones.
///
/// # Errors
///
/// Returns an error if the site does not exist.
pub fn list_zones(
    persistence: &mut Persistence,
    site_id: i64,
) -> Result<ListZonesResponse, ApiError> {
    require_site(persistence, site_id)?;
    let zones = persistence.list_zones(site_id)?;
    Ok(ListZonesResponse {
        site_id,
        zones: zones.iter().map(ZoneInfo::from).collect(),
    })
}

fn lane_direction(request: &LaneRequest) -> Result<LaneDirection, ApiError> {
    Ok(request
        .direction
        .as_deref()
        .map(LaneDirection::from_str)
        .transpose()?
        .unwrap_or_default())
}

/// Creates a lane in a zone. The direction defaults to `BOTH`.
///
/// # Errors
///
/// Returns an error if the name or direction is invalid, the name is taken
/// within the zone, or the zone does not exist.
pub fn create_lane(
    persistence: &mut Persistence,
    zone_id: i64,
    request: &LaneRequest,
) -> Result<LaneInfo, ApiError> {
    let name: String = validate_name("lane", &request.name)?;
    let direction: LaneDirection = lane_direction(request)?;
    let lane = persistence.create_lane(zone_id, &name, direction)?;
    info!(zone_id, lane_id = lane.lane_id, %direction, "Created lane");
    Ok(LaneInfo::from(&lane))
}

/// Replaces a lane's name and direction.
///
/// # Errors
///
/// Returns an error if the lane does not exist or a field is invalid.
pub fn update_lane(
    persistence: &mut Persistence,
    lane_id: i64,
    request: &LaneRequest,
) -> Result<LaneInfo, ApiError> {
    let name: String = validate_name("lane", &request.name)?;
    let direction: LaneDirection = lane_direction(request)?;
    let lane = persistence.update_lane(lane_id, &name, direction)?;
    info!(lane_id, "Updated lane");
    Ok(LaneInfo::from(&lane))
}

/// Deletes a lane. Its devices stay with the site, detached.
///
/// # Errors
///
/// Returns an error if the lane does not exist.
pub fn delete_lane(persistence: &mut Persistence, lane_id: i64) -> Result<(), ApiError> {
    persistence.delete_lane(lane_id)?;
    info!(lane_id, "Deleted lane");
    Ok(())
}

/// Retrieves a lane.
///
/// # Errors
///
/// Returns an error if the lane does not exist.
pub fn get_lane(persistence: &mut Persistence, lane_id: i64) -> Result<LaneInfo, ApiError> {
    let lane = persistence
        .get_lane(lane_id)?
        .ok_or_else(|| not_found("Lane", lane_id))?;
    Ok(LaneInfo::from(&lane))
}

/// Lists a zone's lanes.
///
/// # Errors
///
/// Returns an error if the zone does not exist.
pub fn list_lanes(
    persistence: &mut Persistence,
    zone_id: i64,
) -> Result<ListLanesResponse, ApiError> {
    persistence
        .get_zone(zone_id)?
        .ok_or_else(|| not_found("Zone", zone_id))?;
    let lanes = persistence.list_lanes(zone_id)?;
    Ok(ListLanesResponse {
        zone_id,
        lanes: lanes.iter().map(LaneInfo::from).collect(),
    })
}

// ============================================================================
// Device Controllers
// ============================================================================

/// Creates a device controller, optionally claimed by a site.
///
/// # Errors
///
/// Returns an error if:
/// - The name or host is blank, or the port is outside `1..=65535`
/// - Another controller uses the name
/// - The site does not exist
pub fn create_controller(
    persistence: &mut Persistence,
    request: &CreateControllerRequest,
) -> Result<ControllerInfo, ApiError> {
    let name: String = validate_name("controller", &request.name)?;
    let host: String = validate_name("host", &request.host)?;
    let port: u16 = validate_port(request.port)?;

    let controller = persistence.create_controller(request.site_id, &name, &host, port)?;
    info!(
        controller_id = controller.controller_id,
        site_id = ?controller.site_id,
        "Created device controller"
    );
    Ok(ControllerInfo::from(&controller))
}

/// Replaces a controller's connection details. Site ownership changes only
/// through [`toggle_controller_site`].
///
/// # Errors
///
/// Returns an error if the controller does not exist or a field is invalid.
pub fn update_controller(
    persistence: &mut Persistence,
    controller_id: i64,
    request: &UpdateControllerRequest,
) -> Result<ControllerInfo, ApiError> {
    let name: String = validate_name("controller", &request.name)?;
    let host: String = validate_name("host", &request.host)?;
    let port: u16 = validate_port(request.port)?;

    let controller = persistence.update_controller(controller_id, &name, &host, port)?;
    info!(controller_id, "Updated device controller");
    Ok(ControllerInfo::from(&controller))
}

/// Deletes a controller. Devices wired to it are detached.
///
/// # Errors
///
/// Returns an error if the controller does not exist.
pub fn delete_controller(
    persistence: &mut Persistence,
    controller_id: i64,
) -> Result<(), ApiError> {
    persistence.delete_controller(controller_id)?;
    info!(controller_id, "Deleted device controller");
    Ok(())
}

/// Retrieves a controller.
///
/// # Errors
///
/// Returns an error if the controller does not exist.
pub fn get_controller(
    persistence: &mut Persistence,
    controller_id: i64,
) -> Result<ControllerInfo, ApiError> {
    let controller = persistence
        .get_controller(controller_id)?
        .ok_or_else(|| not_found("Device controller", controller_id))?;
    Ok(ControllerInfo::from(&controller))
}

/// Lists controllers, optionally only those no site has claimed.
///
/// # Errors
///
/// Returns an error if the database cannot be queried.
pub fn list_controllers(
    persistence: &mut Persistence,
    query: &ListControllersQuery,
) -> Result<ListControllersResponse, ApiError> {
    let controllers = persistence.list_controllers(query.unassigned_only.unwrap_or(false))?;
    Ok(ListControllersResponse {
        controllers: controllers.iter().map(ControllerInfo::from).collect(),
    })
}

/// Flips a controller's relation to a site.
///
/// A controller held by the site is released. Any other controller is
/// claimed by the site, including one held by a different site.
///
/// # Errors
///
/// Returns an error if the site or the controller does not exist.
pub fn toggle_controller_site(
    persistence: &mut Persistence,
    site_id: i64,
    controller_id: i64,
    actor: Actor,
    cause: Cause,
) -> Result<ToggleControllerResponse, ApiError> {
    require_site(persistence, site_id)?;
    let outcome = persistence.toggle_controller_site(site_id, controller_id, actor, cause)?;
    let previous_site_id: Option<i64> = match outcome.toggle {
        ControllerToggle::Released => Some(site_id),
        ControllerToggle::Claimed { previous_site_id } => previous_site_id,
    };
    info!(
        site_id,
        controller_id,
        resulting_site_id = ?outcome.controller.site_id,
        event_id = outcome.event_id,
        "Toggled device controller"
    );
    Ok(ToggleControllerResponse {
        controller_id,
        site_id: outcome.controller.site_id,
        previous_site_id,
        event_id: outcome.event_id,
    })
}

// ============================================================================
// Devices
// ============================================================================

/// Creates a device in a site.
///
/// # Errors
///
/// Returns an error if:
/// - The name or kind is invalid, or the name is taken within the site
/// - The site, lane or controller does not exist
/// - The lane belongs to another site
pub fn create_device(
    persistence: &mut Persistence,
    site_id: i64,
    request: &DeviceRequest,
) -> Result<DeviceInfo, ApiError> {
    let name: String = validate_name("device", &request.name)?;
    let kind: DeviceKind = DeviceKind::from_str(&request.kind)?;

    let device = persistence.create_device(
        site_id,
        request.lane_id,
        request.controller_id,
        &name,
        kind,
    )?;
    info!(site_id, device_id = device.device_id, %kind, "Created device");
    Ok(DeviceInfo::from(&device))
}

/// Replaces a device's lane, controller, name and kind.
///
/// # Errors
///
/// Returns an error if the device does not exist, a field is invalid, or a
/// referenced lane or controller does not exist.
pub fn update_device(
    persistence: &mut Persistence,
    device_id: i64,
    request: &DeviceRequest,
) -> Result<DeviceInfo, ApiError> {
    let name: String = validate_name("device", &request.name)?;
    let kind: DeviceKind = DeviceKind::from_str(&request.kind)?;

    let device = persistence.update_device(
        device_id,
        request.lane_id,
        request.controller_id,
        &name,
        kind,
    )?;
    info!(device_id, "Updated device");
    Ok(DeviceInfo::from(&device))
}

/// Deletes a device.
///
/// # Errors
///
/// Returns an error if the device does not exist.
pub fn delete_device(persistence: &mut Persistence, device_id: i64) -> Result<(), ApiError> {
    persistence.delete_device(device_id)?;
    info!(device_id, "Deleted device");
    Ok(())
}

/// Retrieves a device.
///
/// # Errors
///
/// Returns an error if the device does not exist.
pub fn get_device(persistence: &mut Persistence, device_id: i64) -> Result<DeviceInfo, ApiError> {
    let device = persistence
        .get_device(device_id)?
        .ok_or_else(|| not_found("Device", device_id))?;
    Ok(DeviceInfo::from(&device))
}

/// Lists a site's devices.
///
/// # Errors
///
/// Returns an error if the site does not exist.
pub fn list_devices(
    persistence: &mut Persistence,
    site_id: i64,
) -> Result<ListDevicesResponse, ApiError> {
    require_site(persistence, site_id)?;
    let devices = persistence.list_devices(site_id)?;
    Ok(ListDevicesResponse {
        devices: devices.iter().map(DeviceInfo::from).collect(),
    })
}

/// Replaces the device set of a lane.
///
/// Every device currently on the lane is detached, then the listed devices
/// are attached, in one transaction.
///
/// # Errors
///
/// Returns an error if the lane does not exist, or a listed device does not
/// exist or belongs to another site. Nothing changes on error.
pub fn assign_devices_to_lane(
    persistence: &mut Persistence,
    lane_id: i64,
    request: &AssignDevicesRequest,
) -> Result<AssignDevicesResponse, ApiError> {
    let devices = persistence.assign_devices_to_lane(lane_id, &request.device_ids)?;
    info!(lane_id, count = devices.len(), "Assigned devices to lane");
    Ok(AssignDevicesResponse {
        lane_id,
        devices: devices.iter().map(DeviceInfo::from).collect(),
    })
}

// ============================================================================
// Policies
// ============================================================================

/// Creates a policy in a site.
///
/// Missing configuration keys take their defaults. Creating a selected
/// blacklist clears the selection of the site's other blacklists.
///
/// # Errors
///
/// Returns an error if:
/// - The type, name, code or configuration is invalid
/// - The name is taken within the site
/// - The site does not exist
pub fn create_policy(
    persistence: &mut Persistence,
    site_id: i64,
    request: &CreatePolicyRequest,
) -> Result<PolicyInfo, ApiError> {
    let policy: NewPolicy = new_policy(site_id, request)?;
    let created = persistence.create_policy(&policy)?;
    info!(
        site_id,
        policy_id = created.policy_id,
        policy_type = %created.policy_type(),
        "Created policy"
    );
    policy_info(&created)
}

/// Changes a policy's name, code or configuration.
///
/// The configuration patch is merged one level deep. Blacklist selection
/// cannot be changed here.
///
/// # Errors
///
/// Returns an error if the policy does not exist, the patch names an
/// unknown configuration key, or the new name is invalid or taken.
pub fn update_policy(
    persistence: &mut Persistence,
    policy_id: i64,
    request: &UpdatePolicyRequest,
) -> Result<PolicyInfo, ApiError> {
    let update = PolicyUpdate {
        name: request.name.clone(),
        code: request.code.clone().map(Some),
        config: request.config.clone(),
    };
    let updated = persistence.update_policy(policy_id, &update)?;
    info!(policy_id, "Updated policy");
    policy_info(&updated)
}

/// Deletes a policy.
///
/// # Errors
///
/// Returns an error if the policy does not exist or is a system policy.
pub fn delete_policy(persistence: &mut Persistence, policy_id: i64) -> Result<(), ApiError> {
    persistence.delete_policy(policy_id)?;
    info!(policy_id, "Deleted policy");
    Ok(())
}

/// Retrieves a policy.
///
/// # Errors
///
/// Returns an error if the policy does not exist.
pub fn get_policy(persistence: &mut Persistence, policy_id: i64) -> Result<PolicyInfo, ApiError> {
    let policy = persistence
        .get_policy(policy_id)?
        .ok_or_else(|| not_found("Policy", policy_id))?;
    policy_info(&policy)
}

/// Lists policies matching a filter, sorted and paged.
///
/// # Errors
///
/// Returns an error if the type, sort key, direction or paging parameters
/// are invalid.
pub fn list_policies(
    persistence: &mut Persistence,
    query: &ListPoliciesQuery,
) -> Result<ListPoliciesResponse, ApiError> {
    let filter = PolicyFilter {
        site_id: query.site_id,
        policy_type: query
            .policy_type
            .as_deref()
            .map(PolicyType::from_str)
            .transpose()?,
        name_contains: validate_optional_text("name", query.name.as_deref())?,
        is_system: query.is_system,
    };
    let sort: PolicySort = query
        .sort
        .as_deref()
        .map(PolicySort::from_str)
        .transpose()?
        .unwrap_or_default();
    let direction: SortDirection = query
        .direction
        .as_deref()
        .map(SortDirection::from_str)
        .transpose()?
        .unwrap_or_default();
    let page: PageRequest = page_request(query.page, query.per_page)?;

    let result = persistence.list_policies(&filter, sort, direction, page)?;
    let policies: Vec<PolicyInfo> = result
        .items
        .iter()
        .map(policy_info)
        .collect::<Result<_, _>>()?;
    Ok(ListPoliciesResponse {
        policies,
        total: result.total,
        page: result.page,
        per_page: result.per_page,
    })
}

/// Retrieves a site's selected blacklist, if any.
///
/// # Errors
///
/// Returns an error if the site does not exist.
pub fn get_selected_blacklist(
    persistence: &mut Persistence,
    site_id: i64,
) -> Result<SelectedBlacklistResponse, ApiError> {
    require_site(persistence, site_id)?;
    let policy = persistence
        .get_selected_blacklist(site_id)?
        .as_ref()
        .map(policy_info)
        .transpose()?;
    Ok(SelectedBlacklistResponse { site_id, policy })
}

/// Replaces every policy of a site in one transaction.
///
/// # Errors
///
/// Returns an error if an entry is invalid, two entries share a name, more
/// than one blacklist is selected, or the site does not exist. Nothing
/// changes on error.
pub fn reset_policies(
    persistence: &mut Persistence,
    site_id: i64,
    request: &ResetPoliciesRequest,
    actor: Actor,
    cause: Cause,
) -> Result<ResetPoliciesResponse, ApiError> {
    let replacements: Vec<NewPolicy> = request
        .policies
        .iter()
        .map(|entry| new_policy(site_id, entry))
        .collect::<Result<_, _>>()?;

    let reset = persistence.reset_policies(site_id, &replacements, actor, cause)?;
    info!(
        site_id,
        removed = reset.removed,
        inserted = reset.policies.len(),
        event_id = reset.event_id,
        "Reset site policies"
    );
    let policies: Vec<PolicyInfo> = reset
        .policies
        .iter()
        .map(policy_info)
        .collect::<Result<_, _>>()?;
    Ok(ResetPoliciesResponse {
        site_id,
        removed: reset.removed,
        policies,
        event_id: reset.event_id,
    })
}

/// Makes a blacklist the site's selected one, clearing every other
/// selection in the same transaction.
///
/// # Errors
///
/// Returns `ResourceNotFound` if the target does not exist, is not a
/// blacklist, or belongs to another site. The previous selection is kept.
pub fn select_blacklist_policy(
    persistence: &mut Persistence,
    site_id: i64,
    request: &SelectBlacklistRequest,
    actor: Actor,
    cause: Cause,
) -> Result<SelectBlacklistResponse, ApiError> {
    let selection =
        persistence.select_blacklist_policy(site_id, request.policy_id, actor, cause)?;
    info!(
        site_id,
        policy_id = request.policy_id,
        previous_policy_id = ?selection.previous_policy_id,
        event_id = selection.event_id,
        "Selected blacklist policy"
    );
    Ok(SelectBlacklistResponse {
        policy: policy_info(&selection.policy)?,
        previous_policy_id: selection.previous_policy_id,
        event_id: selection.event_id,
    })
}

// ============================================================================
// Holidays
// ============================================================================

/// Creates a holiday in a site.
///
/// # Errors
///
/// Returns an error if the name or date is invalid, the site does not
/// exist, or a holiday already occupies the calendar day. The conflict
/// carries the stored holiday.
pub fn create_holiday(
    persistence: &mut Persistence,
    site_id: i64,
    request: &HolidayRequest,
) -> Result<HolidayInfo, ApiError> {
    let name: String = validate_name("holiday", &request.name)?;
    let date: Date = parse_date(&request.date)?;

    let holiday = persistence.create_holiday(site_id, &name, date, request.is_recurring)?;
    info!(
        site_id,
        holiday_id = holiday.holiday_id,
        %date,
        recurring = holiday.is_recurring,
        "Created holiday"
    );
    Ok(HolidayInfo::from(&holiday))
}

/// Replaces a holiday's name, date and recurrence.
///
/// # Errors
///
/// Returns an error if the holiday does not exist, a field is invalid, or
/// another holiday occupies the new calendar day.
pub fn update_holiday(
    persistence: &mut Persistence,
    holiday_id: i64,
    request: &HolidayRequest,
) -> Result<HolidayInfo, ApiError> {
    let name: String = validate_name("holiday", &request.name)?;
    let date: Date = parse_date(&request.date)?;

    let holiday = persistence.update_holiday(holiday_id, &name, date, request.is_recurring)?;
    info!(holiday_id, %date, "Updated holiday");
    Ok(HolidayInfo::from(&holiday))
}

/// Deletes a holiday.
///
/// # Errors
///
/// Returns an error if the holiday does not exist.
pub fn delete_holiday(persistence: &mut Persistence, holiday_id: i64) -> Result<(), ApiError> {
    persistence.delete_holiday(holiday_id)?;
    info!(holiday_id, "Deleted holiday");
    Ok(())
}

/// Retrieves a holiday.
///
/// # Errors
///
/// Returns an error if the holiday does not exist.
pub fn get_holiday(
    persistence: &mut Persistence,
    holiday_id: i64,
) -> Result<HolidayInfo, ApiError> {
    let holiday = persistence
        .get_holiday(holiday_id)?
        .ok_or_else(|| not_found("Holiday", holiday_id))?;
    Ok(HolidayInfo::from(&holiday))
}

/// Lists a site's holidays, optionally for one year.
///
/// # Errors
///
/// Returns an error if the site does not exist.
pub fn list_holidays(
    persistence: &mut Persistence,
    site_id: i64,
    query: &ListHolidaysQuery,
) -> Result<ListHolidaysResponse, ApiError> {
    require_site(persistence, site_id)?;
    let holidays = persistence.list_holidays(site_id, query.year)?;
    Ok(ListHolidaysResponse {
        holidays: holidays.iter().map(HolidayInfo::from).collect(),
    })
}

/// Reports whether a date is a holiday at a site.
///
/// Without a date the site's current calendar day is checked.
///
/// # Errors
///
/// Returns an error if the site does not exist or the date is invalid.
pub fn is_holiday(
    persistence: &mut Persistence,
    site_id: i64,
    query: &IsHolidayQuery,
    now: OffsetDateTime,
) -> Result<IsHolidayResponse, ApiError> {
    let site: Site = require_site(persistence, site_id)?;
    let date: Date = resolve_day(&site, query.date.as_deref(), now)?;
    let is_holiday: bool = persistence.is_holiday(site_id, date)?;
    Ok(IsHolidayResponse {
        site_id,
        date: format_date(date),
        is_holiday,
    })
}

// ============================================================================
// Members & Payments
// ============================================================================

/// Registers a member of a site.
///
/// # Errors
///
/// Returns an error if a field is invalid, the plate is already registered
/// at the site, or the site does not exist.
pub fn create_member(
    persistence: &mut Persistence,
    site_id: i64,
    request: &MemberRequest,
) -> Result<MemberInfo, ApiError> {
    let name: String = validate_name("member", &request.name)?;
    let car_number: String = normalize_car_number(&request.car_number)?;
    let phone: Option<String> = validate_optional_text("phone", request.phone.as_deref())?;

    let member = persistence.create_member(site_id, &name, &car_number, phone.as_deref())?;
    info!(site_id, member_id = member.member_id, "Created member");
    Ok(MemberInfo::from(&member))
}

/// Replaces a member's name, plate and phone.
///
/// # Errors
///
/// Returns an error if the member does not exist, a field is invalid, or
/// the plate is taken at the site.
pub fn update_member(
    persistence: &mut Persistence,
    member_id: i64,
    request: &MemberRequest,
) -> Result<MemberInfo, ApiError> {
    let name: String = validate_name("member", &request.name)?;
    let car_number: String = normalize_car_number(&request.car_number)?;
    let phone: Option<String> = validate_optional_text("phone", request.phone.as_deref())?;

    let member = persistence.update_member(member_id, &name, &car_number, phone.as_deref())?;
    info!(member_id, "Updated member");
    Ok(MemberInfo::from(&member))
}

/// Deletes a member with its payment history.
///
/// # Errors
///
/// Returns an error if the member does not exist.
pub fn delete_member(persistence: &mut Persistence, member_id: i64) -> Result<(), ApiError> {
    persistence.delete_member(member_id)?;
    info!(member_id, "Deleted member");
    Ok(())
}

/// Retrieves a member.
///
/// # Errors
///
/// Returns an error if the member does not exist.
pub fn get_member(persistence: &mut Persistence, member_id: i64) -> Result<MemberInfo, ApiError> {
    let member = persistence
        .get_member(member_id)?
        .ok_or_else(|| not_found("Member", member_id))?;
    Ok(MemberInfo::from(&member))
}

/// Finds a site's member by plate.
///
/// # Errors
///
/// Returns an error if the plate is invalid or no member of the site has it.
pub fn find_member_by_car_number(
    persistence: &mut Persistence,
    site_id: i64,
    query: &CarNumberQuery,
) -> Result<MemberInfo, ApiError> {
    let car_number: String = normalize_car_number(&query.car_number)?;
    let member = persistence
        .find_member_by_car_number(site_id, &car_number)?
        .ok_or_else(|| ApiError::ResourceNotFound {
            resource_type: String::from("Member"),
            message: format!("No member with car number {car_number} at site {site_id}"),
        })?;
    Ok(MemberInfo::from(&member))
}

/// Lists a site's members by name, paged.
///
/// # Errors
///
/// Returns an error if the site does not exist or the paging parameters
/// are invalid.
pub fn list_members(
    persistence: &mut Persistence,
    site_id: i64,
    query: &PageQuery,
) -> Result<ListMembersResponse, ApiError> {
    require_site(persistence, site_id)?;
    let page: PageRequest = page_request(query.page, query.per_page)?;
    let result = persistence.list_members(site_id, page)?;
    Ok(ListMembersResponse {
        members: result.items.iter().map(MemberInfo::from).collect(),
        total: result.total,
        page: result.page,
        per_page: result.per_page,
    })
}

/// Records a successful membership payment.
///
/// `paid_at` defaults to `now`.
///
/// # Errors
///
/// Returns an error if:
/// - The amount is negative or the period ends before it starts
/// - The member or the membership policy does not exist
/// - A successful payment already covers part of the period; the conflict
///   carries the stored record
pub fn create_payment(
    persistence: &mut Persistence,
    member_id: i64,
    request: &CreatePaymentRequest,
    now: OffsetDateTime,
) -> Result<PaymentInfo, ApiError> {
    validate_amount("amount", request.amount)?;
    let start: Date = parse_date(&request.start_date)?;
    let end: Date = parse_date(&request.end_date)?;
    validate_period(start, end)?;
    let paid_at: OffsetDateTime = request
        .paid_at
        .as_deref()
        .map(parse_timestamp)
        .transpose()?
        .unwrap_or(now);

    let payment = persistence.create_payment(
        member_id,
        request.policy_id,
        request.amount,
        start,
        end,
        paid_at,
    )?;
    info!(
        member_id,
        history_id = payment.history_id,
        %start,
        %end,
        "Recorded membership payment"
    );
    Ok(PaymentInfo::from(&payment))
}

/// Cancels a payment, freeing its period.
///
/// # Errors
///
/// Returns an error if the payment does not exist.
pub fn cancel_payment(
    persistence: &mut Persistence,
    history_id: i64,
) -> Result<PaymentInfo, ApiError> {
    let payment = persistence.cancel_payment(history_id)?;
    info!(history_id, member_id = payment.member_id, "Canceled membership payment");
    Ok(PaymentInfo::from(&payment))
}

/// Retrieves a payment.
///
/// # Errors
///
/// Returns an error if the payment does not exist.
pub fn get_payment(
    persistence: &mut Persistence,
    history_id: i64,
) -> Result<PaymentInfo, ApiError> {
    let payment = persistence
        .get_payment(history_id)?
        .ok_or_else(|| not_found("Payment", history_id))?;
    Ok(PaymentInfo::from(&payment))
}

/// Lists a member's payments.
///
/// # Errors
///
/// Returns an error if the member does not exist.
pub fn list_payments(
    persistence: &mut Persistence,
    member_id: i64,
) -> Result<ListPaymentsResponse, ApiError> {
    persistence
        .get_member(member_id)?
        .ok_or_else(|| not_found("Member", member_id))?;
    let payments = persistence.list_payments(member_id)?;
    Ok(ListPaymentsResponse {
        member_id,
        payments: payments.iter().map(PaymentInfo::from).collect(),
    })
}

/// Selects the payment record in force for a member.
///
/// Without `as_of` the reference day is the current calendar day of the
/// member's site.
///
/// # Errors
///
/// Returns an error if the member does not exist or `as_of` is invalid.
pub fn effective_membership(
    persistence: &mut Persistence,
    member_id: i64,
    query: &EffectiveMembershipQuery,
    now: OffsetDateTime,
) -> Result<EffectiveMembershipResponse, ApiError> {
    let member = persistence
        .get_member(member_id)?
        .ok_or_else(|| not_found("Member", member_id))?;
    let site: Site = require_site(persistence, member.site_id)?;
    let today: Date = resolve_day(&site, query.as_of.as_deref(), now)?;

    let effective = persistence.effective_membership(member_id, today)?;
    debug!(member_id, %today, found = effective.is_some(), "Resolved effective membership");
    Ok(EffectiveMembershipResponse {
        member_id,
        as_of: format_date(today),
        effective: effective.map(|e| EffectiveMembershipInfo {
            state: e.state.as_str().to_string(),
            payment: PaymentInfo::from(&e.history),
        }),
    })
}

// ============================================================================
// Parking Sessions
// ============================================================================

fn applied_discounts(discounts: Option<&[AppliedDiscountInfo]>) -> Option<Vec<AppliedDiscount>> {
    discounts.map(|list| list.iter().map(AppliedDiscount::from).collect())
}

/// Opens a `PENDING` session for a vehicle entering a site.
///
/// The entry time defaults to `now`.
///
/// # Errors
///
/// Returns an error if:
/// - The plate or entry data is invalid
/// - The site does not exist, or the entry lane or zone is not part of it
/// - The vehicle already has an active session at the site; the error
///   carries that session's id
pub fn open_session(
    persistence: &mut Persistence,
    site_id: i64,
    request: &OpenSessionRequest,
    actor: Actor,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<SessionTransitionResponse, ApiError> {
    let entry: LaneContext = lane_context(&request.entry, now)?;
    let session: NewSession = NewSession::new(
        site_id,
        &request.car_number,
        entry,
        request.vehicle_type.as_deref(),
        request.note.as_deref(),
    )?;

    let transition =
        persistence.apply_session_command(Command::OpenSession { session }, actor, cause)?;
    info!(
        site_id,
        session_id = transition.session.session_id,
        car_number = %transition.session.car_number,
        "Opened parking session"
    );
    Ok(transition_response(&transition))
}

/// Applies settlement progress to an active session.
///
/// Only exit context, fees, status, note, applied discounts and the
/// pre-settlement time change. An exit without a time uses `now`.
///
/// # Errors
///
/// Returns an error if:
/// - The session does not exist or is already closed
/// - The status change is not part of the session state machine
/// - A fee is negative or a field is invalid
/// - The exit lane or zone is not part of the session's site
pub fn update_session(
    persistence: &mut Persistence,
    session_id: i64,
    request: &UpdateSessionRequest,
    actor: Actor,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<SessionTransitionResponse, ApiError> {
    let patch = SessionPatch {
        exit: request
            .exit
            .as_ref()
            .map(|exit| lane_context(exit, now))
            .transpose()?,
        total_fee: request.total_fee,
        discount_fee: request.discount_fee,
        paid_fee: request.paid_fee,
        status: request
            .status
            .as_deref()
            .map(SessionStatus::from_str)
            .transpose()?,
        note: request.note.clone().map(Some),
        applied_discounts: applied_discounts(request.applied_discounts.as_deref()),
        pre_settled_at: request
            .pre_settled_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?,
    };

    let transition = persistence.apply_session_command(
        Command::AmendSession { session_id, patch },
        actor,
        cause,
    )?;
    info!(
        session_id,
        status = %transition.session.status,
        "Updated parking session"
    );
    Ok(transition_response(&transition))
}

/// Closes a session as `COMPLETED`, or `FORCE_COMPLETED` when forced.
///
/// The exit time defaults to `now`.
///
/// # Errors
///
/// Returns an error if the session does not exist or is already closed, a
/// fee or exit field is invalid, or the exit lane is not part of the site.
pub fn close_session(
    persistence: &mut Persistence,
    session_id: i64,
    request: &CloseSessionRequest,
    actor: Actor,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<SessionTransitionResponse, ApiError> {
    let command = Command::CloseSession {
        session_id,
        exit: lane_context(&request.exit, now)?,
        total_fee: request.total_fee,
        discount_fee: request.discount_fee,
        paid_fee: request.paid_fee,
        applied_discounts: applied_discounts(request.applied_discounts.as_deref()),
        note: request.note.clone().map(Some),
        forced: request.forced,
    };

    let transition = persistence.apply_session_command(command, actor, cause)?;
    info!(
        session_id,
        status = %transition.session.status,
        paid_fee = transition.session.paid_fee,
        "Closed parking session"
    );
    Ok(transition_response(&transition))
}

/// Retrieves a session.
///
/// # Errors
///
/// Returns an error if the session does not exist.
pub fn get_session(
    persistence: &mut Persistence,
    session_id: i64,
) -> Result<SessionInfo, ApiError> {
    let session = persistence
        .get_session(session_id)?
        .ok_or_else(|| not_found("Session", session_id))?;
    Ok(SessionInfo::from(&session))
}

/// Finds the most recent active session of a plate at a site.
///
/// # Errors
///
/// Returns an error if the site does not exist or the plate is invalid.
pub fn find_active_session(
    persistence: &mut Persistence,
    site_id: i64,
    query: &CarNumberQuery,
) -> Result<ActiveSessionResponse, ApiError> {
    require_site(persistence, site_id)?;
    let car_number: String = normalize_car_number(&query.car_number)?;
    let session = persistence.find_active_session(site_id, &car_number)?;
    Ok(ActiveSessionResponse {
        site_id,
        car_number,
        session: session.as_ref().map(SessionInfo::from),
    })
}

/// Lists a site's sessions, newest entry first, paged.
///
/// # Errors
///
/// Returns an error if the site does not exist or a filter or paging
/// parameter is invalid.
pub fn list_sessions(
    persistence: &mut Persistence,
    site_id: i64,
    query: &ListSessionsQuery,
) -> Result<ListSessionsResponse, ApiError> {
    require_site(persistence, site_id)?;
    let filter = SessionFilter {
        status: query
            .status
            .as_deref()
            .map(SessionStatus::from_str)
            .transpose()?,
        active_only: query.active_only.unwrap_or(false),
        car_number: query
            .car_number
            .as_deref()
            .map(normalize_car_number)
            .transpose()?,
    };
    let page: PageRequest = page_request(query.page, query.per_page)?;

    let result = persistence.list_sessions(site_id, &filter, page)?;
    Ok(ListSessionsResponse {
        sessions: result.items.iter().map(SessionInfo::from).collect(),
        total: result.total,
        page: result.page,
        per_page: result.per_page,
    })
}

// ============================================================================
// Statistics & Audit
// ============================================================================

fn window_start(
    site: &Site,
    query: &StatisticsQuery,
    now: OffsetDateTime,
) -> Result<OffsetDateTime, ApiError> {
    if let Some(value) = query.day_start.as_deref() {
        return Ok(parse_timestamp(value)?);
    }
    let date: Date = resolve_day(site, query.date.as_deref(), now)?;
    Ok(local_day_start(&site.timezone, date)?)
}

/// Computes a site's dashboard figures.
///
/// The window starts at `day_start` when given, otherwise at local midnight
/// of `date`, otherwise at local midnight of the site's current day.
///
/// # Errors
///
/// Returns an error if the site does not exist or a parameter is invalid.
pub fn get_statistics(
    persistence: &mut Persistence,
    site_id: i64,
    query: &StatisticsQuery,
    now: OffsetDateTime,
) -> Result<StatisticsResponse, ApiError> {
    let site: Site = require_site(persistence, site_id)?;
    let day_start: OffsetDateTime = window_start(&site, query, now)?;

    let stats = persistence.get_statistics(site_id, day_start)?;
    debug!(
        site_id,
        entries = stats.entries,
        exits = stats.exits,
        parked = stats.currently_parked,
        "Computed site statistics"
    );
    Ok(StatisticsResponse::new(site_id, &stats))
}

/// Retrieves an audit event.
///
/// # Errors
///
/// Returns an error if the event does not exist.
pub fn get_audit_event(
    persistence: &mut Persistence,
    event_id: i64,
) -> Result<AuditEventInfo, ApiError> {
    let record = persistence.get_audit_event(event_id)?;
    Ok(AuditEventInfo::from(&record))
}

/// Lists a site's audit events, newest first, paged.
///
/// # Errors
///
/// Returns an error if the site does not exist or the paging parameters
/// are invalid.
pub fn list_audit_events(
    persistence: &mut Persistence,
    site_id: i64,
    query: &PageQuery,
) -> Result<ListAuditEventsResponse, ApiError> {
    require_site(persistence, site_id)?;
    let page: PageRequest = page_request(query.page, query.per_page)?;
    let result = persistence.list_audit_events(site_id, page)?;
    Ok(ListAuditEventsResponse {
        events: result.items.iter().map(AuditEventInfo::from).collect(),
        total: result.total,
        page: result.page,
        per_page: result.per_page,
    })
}
