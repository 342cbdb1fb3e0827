// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.
//!
//! Requests carry raw client input and are validated by the handlers.
//! Unknown keys in request bodies are ignored, so a client cannot reach
//! fields that a request type does not name.

use parkops_domain::{
    AppliedDiscount, Device, DeviceController, DomainError, Holiday, Lane, LaneContext, LaneNode,
    Member, ParkingSession, PaymentHistory, Policy, Site, SiteStatistics, SiteTree, StatusCounts,
    Zone, ZoneNode, format_date, format_timestamp,
};
use parkops_persistence::AuditEventRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

// ============================================================================
// Topology
// ============================================================================

/// API request to create a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSiteRequest {
    /// Display name, unique across sites.
    pub name: String,
    /// IANA timezone; defaults to `UTC`.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
}

/// API request to replace a site's fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSiteRequest {
    /// New name.
    pub name: String,
    /// New IANA timezone.
    pub timezone: String,
    /// New address; absent clears it.
    #[serde(default)]
    pub address: Option<String>,
}

/// Site information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    /// The canonical site identifier.
    pub site_id: i64,
    /// Display name.
    pub name: String,
    /// IANA timezone.
    pub timezone: String,
    /// Street address.
    pub address: Option<String>,
}

/// API response listing sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSitesResponse {
    /// All sites by name.
    pub sites: Vec<SiteInfo>,
}

/// API request to create or rename a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRequest {
    /// Zone name, unique within the site.
    pub name: String,
}

/// Zone information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneInfo {
    /// The canonical zone identifier.
    pub zone_id: i64,
    /// Owning site.
    pub site_id: i64,
    /// Zone name.
    pub name: String,
}

/// API response listing a site's zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListZonesResponse {
    /// The site.
    pub site_id: i64,
    /// Zones by name.
    pub zones: Vec<ZoneInfo>,
}

/// API request to create or replace a lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneRequest {
    /// Lane name, unique within the zone.
    pub name: String,
    /// `ENTRY`, `EXIT` or `BOTH` (the default).
    #[serde(default)]
    pub direction: Option<String>,
}

/// Lane information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneInfo {
    /// The canonical lane identifier.
    pub lane_id: i64,
    /// Owning zone.
    pub zone_id: i64,
    /// Lane name.
    pub name: String,
    /// Traffic direction.
    pub direction: String,
}

/// API response listing a zone's lanes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListLanesResponse {
    /// The zone.
    pub zone_id: i64,
    /// Lanes by name.
    pub lanes: Vec<LaneInfo>,
}

/// API request to create a device controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateControllerRequest {
    /// Site claiming the controller at creation, if any.
    #[serde(default)]
    pub site_id: Option<i64>,
    /// Globally unique name.
    pub name: String,
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u32,
}

/// API request to replace a controller's connection details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateControllerRequest {
    /// New name.
    pub name: String,
    /// New host.
    pub host: String,
    /// New port.
    pub port: u32,
}

/// Device controller information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerInfo {
    /// The canonical controller identifier.
    pub controller_id: i64,
    /// Site currently holding the controller.
    pub site_id: Option<i64>,
    /// Controller name.
    pub name: String,
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// API response listing controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListControllersResponse {
    /// Matching controllers.
    pub controllers: Vec<ControllerInfo>,
}

/// Query parameters for listing controllers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListControllersQuery {
    /// Only controllers no site has claimed.
    #[serde(default)]
    pub unassigned_only: Option<bool>,
}

/// API response for a controller claim or release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleControllerResponse {
    /// The controller.
    pub controller_id: i64,
    /// Site holding the controller afterwards; `None` when released.
    pub site_id: Option<i64>,
    /// Site that held the controller before the toggle.
    pub previous_site_id: Option<i64>,
    /// The event ID of the persisted audit event.
    pub event_id: i64,
}

/// API request to create or replace a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRequest {
    /// Lane to mount the device on.
    #[serde(default)]
    pub lane_id: Option<i64>,
    /// Controller the device is wired to.
    #[serde(default)]
    pub controller_id: Option<i64>,
    /// Device name, unique within the site.
    pub name: String,
    /// `ENTRY_CAMERA`, `EXIT_CAMERA`, `DISPLAY`, `BARRIER` or `SENSOR`.
    pub kind: String,
}

/// Device information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// The canonical device identifier.
    pub device_id: i64,
    /// Owning site.
    pub site_id: i64,
    /// Lane the device is mounted on.
    pub lane_id: Option<i64>,
    /// Controller the device is wired to.
    pub controller_id: Option<i64>,
    /// Device name.
    pub name: String,
    /// Device kind.
    pub kind: String,
}

/// API response listing devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDevicesResponse {
    /// Matching devices.
    pub devices: Vec<DeviceInfo>,
}

/// API request to replace the device set of a lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignDevicesRequest {
    /// Devices that should end up on the lane. Empty detaches all.
    pub device_ids: Vec<i64>,
}

/// API response for a lane device assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignDevicesResponse {
    /// The lane.
    pub lane_id: i64,
    /// Devices now on the lane.
    pub devices: Vec<DeviceInfo>,
}

/// A lane with its devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneTreeInfo {
    /// The lane.
    pub lane: LaneInfo,
    /// Devices mounted on the lane.
    pub devices: Vec<DeviceInfo>,
}

/// A zone with its lanes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTreeInfo {
    /// The zone.
    pub zone: ZoneInfo,
    /// Lanes in the zone.
    pub lanes: Vec<LaneTreeInfo>,
}

/// API response with the full configuration graph of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteTreeResponse {
    /// The site.
    pub site: SiteInfo,
    /// Controllers claimed by the site.
    pub controllers: Vec<ControllerInfo>,
    /// Zones, lanes and mounted devices.
    pub zones: Vec<ZoneTreeInfo>,
    /// Devices not mounted on any lane.
    pub unassigned_devices: Vec<DeviceInfo>,
}

// ============================================================================
// Policies
// ============================================================================

/// API request to create a policy. Also used for each entry of a reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePolicyRequest {
    /// `FEE`, `REDUCTION`, `BLACKLIST` or `MEMBERSHIP`.
    pub policy_type: String,
    /// Name, unique within the site.
    pub name: String,
    /// Operator-facing code.
    #[serde(default)]
    pub code: Option<String>,
    /// Configuration document for the policy type.
    #[serde(default)]
    pub config: Value,
    /// Marks a system-seeded policy.
    #[serde(default)]
    pub is_system: bool,
}

/// API request to change a policy.
///
/// Site, type and system flag are not part of this request; keys for them
/// in a request body are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePolicyRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New code; a blank string clears it.
    #[serde(default)]
    pub code: Option<String>,
    /// Config patch, merged one level deep.
    #[serde(default)]
    pub config: Option<Value>,
}

/// Query parameters for listing policies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPoliciesQuery {
    /// Restrict to one site.
    #[serde(default)]
    pub site_id: Option<i64>,
    /// Restrict to one policy type.
    #[serde(default)]
    pub policy_type: Option<String>,
    /// Case-insensitive name substring.
    #[serde(default)]
    pub name: Option<String>,
    /// Restrict by system flag.
    #[serde(default)]
    pub is_system: Option<bool>,
    /// `id`, `name` or `created_at`.
    #[serde(default)]
    pub sort: Option<String>,
    /// `asc` or `desc`.
    #[serde(default)]
    pub direction: Option<String>,
    /// 1-based page.
    #[serde(default)]
    pub page: Option<u32>,
    /// Page size.
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// Policy information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyInfo {
    /// The canonical policy identifier.
    pub policy_id: i64,
    /// Owning site.
    pub site_id: i64,
    /// Policy type.
    pub policy_type: String,
    /// Policy name.
    pub name: String,
    /// Operator-facing code.
    pub code: Option<String>,
    /// Full configuration with defaults applied.
    pub config: Value,
    /// Whether the policy was seeded by the system.
    pub is_system: bool,
    /// Whether this is the site's selected blacklist.
    pub is_selected: bool,
    /// Creation time (RFC 3339).
    pub created_at: String,
    /// Last modification time (RFC 3339).
    pub updated_at: String,
}

/// API response listing policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPoliciesResponse {
    /// Policies on this page.
    pub policies: Vec<PolicyInfo>,
    /// Total matching policies.
    pub total: u64,
    /// Page served.
    pub page: u32,
    /// Page size used.
    pub per_page: u32,
}

/// API request to replace every policy of a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetPoliciesRequest {
    /// The replacement set.
    pub policies: Vec<CreatePolicyRequest>,
}

/// API response for a policy reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetPoliciesResponse {
    /// The site.
    pub site_id: i64,
    /// Number of policies removed.
    pub removed: usize,
    /// The policies now in force.
    pub policies: Vec<PolicyInfo>,
    /// The event ID of the persisted audit event.
    pub event_id: i64,
}

/// API request to select a site's blacklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectBlacklistRequest {
    /// The blacklist to select.
    pub policy_id: i64,
}

/// API response for a blacklist selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectBlacklistResponse {
    /// The selected policy.
    pub policy: PolicyInfo,
    /// The blacklist selected before, if any.
    pub previous_policy_id: Option<i64>,
    /// The event ID of the persisted audit event.
    pub event_id: i64,
}

/// API response with a site's selected blacklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedBlacklistResponse {
    /// The site.
    pub site_id: i64,
    /// The selected blacklist, if any.
    pub policy: Option<PolicyInfo>,
}

// ============================================================================
// Holidays
// ============================================================================

/// API request to create or replace a holiday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRequest {
    /// Holiday name.
    pub name: String,
    /// `YYYY-MM-DD`. Only month and day matter when recurring.
    pub date: String,
    /// Whether the holiday repeats every year.
    #[serde(default)]
    pub is_recurring: bool,
}

/// Holiday information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayInfo {
    /// The canonical holiday identifier.
    pub holiday_id: i64,
    /// Owning site.
    pub site_id: i64,
    /// Holiday name.
    pub name: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Whether the holiday repeats every year.
    pub is_recurring: bool,
}

/// API response listing holidays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListHolidaysResponse {
    /// Holidays in calendar order.
    pub holidays: Vec<HolidayInfo>,
}

/// Query parameters for listing holidays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListHolidaysQuery {
    /// Restrict to one year. Recurring holidays are always included.
    #[serde(default)]
    pub year: Option<i32>,
}

/// Query parameters for a holiday lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsHolidayQuery {
    /// `YYYY-MM-DD`; defaults to the site's current day.
    #[serde(default)]
    pub date: Option<String>,
}

/// API response for a holiday lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsHolidayResponse {
    /// The site.
    pub site_id: i64,
    /// The date checked.
    pub date: String,
    /// Whether the date is a holiday at the site.
    pub is_holiday: bool,
}

// ============================================================================
// Members & Payments
// ============================================================================

/// API request to create or replace a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRequest {
    /// Member name.
    pub name: String,
    /// Vehicle plate.
    pub car_number: String,
    /// Contact number.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Member information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    /// The canonical member identifier.
    pub member_id: i64,
    /// Owning site.
    pub site_id: i64,
    /// Member name.
    pub name: String,
    /// Normalized vehicle plate.
    pub car_number: String,
    /// Contact number.
    pub phone: Option<String>,
}

/// API response listing members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMembersResponse {
    /// Members on this page.
    pub members: Vec<MemberInfo>,
    /// Total members of the site.
    pub total: u64,
    /// Page served.
    pub page: u32,
    /// Page size used.
    pub per_page: u32,
}

/// API request to record a membership payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    /// The membership policy paid for.
    pub policy_id: i64,
    /// Amount in minor units.
    pub amount: i64,
    /// First covered day, `YYYY-MM-DD`.
    pub start_date: String,
    /// Last covered day, `YYYY-MM-DD`, inclusive.
    pub end_date: String,
    /// Payment time (RFC 3339); defaults to now.
    #[serde(default)]
    pub paid_at: Option<String>,
}

/// Payment history information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    /// The canonical payment identifier.
    pub history_id: i64,
    /// The paying member.
    pub member_id: i64,
    /// The membership policy.
    pub policy_id: i64,
    /// Amount in minor units.
    pub amount: i64,
    /// `SUCCESS` or `CANCELED`.
    pub status: String,
    /// First covered day.
    pub start_date: String,
    /// Last covered day.
    pub end_date: String,
    /// Payment time.
    pub paid_at: String,
}

/// API response listing a member's payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPaymentsResponse {
    /// The member.
    pub member_id: i64,
    /// Payments by start date.
    pub payments: Vec<PaymentInfo>,
}

/// Query parameters for an effective membership lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveMembershipQuery {
    /// Reference day, `YYYY-MM-DD`; defaults to the site's current day.
    #[serde(default)]
    pub as_of: Option<String>,
}

/// Query parameters for a plate lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarNumberQuery {
    /// Vehicle plate; normalized before the lookup.
    pub car_number: String,
}

/// The payment record in force for a reference day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveMembershipInfo {
    /// `ACTIVE`, `UPCOMING` or `EXPIRED`.
    pub state: String,
    /// The selected record.
    pub payment: PaymentInfo,
}

/// API response for an effective membership lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveMembershipResponse {
    /// The member.
    pub member_id: i64,
    /// The reference day, in the site's calendar.
    pub as_of: String,
    /// The ranked record, if the member has any successful payment.
    pub effective: Option<EffectiveMembershipInfo>,
}

// ============================================================================
// Parking Sessions
// ============================================================================

/// A lane crossing as reported by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneEventRequest {
    /// Zone of the lane.
    #[serde(default)]
    pub zone_id: Option<i64>,
    /// Lane crossed.
    #[serde(default)]
    pub lane_id: Option<i64>,
    /// Crossing time (RFC 3339); defaults to now.
    #[serde(default)]
    pub time: Option<String>,
    /// Snapshot reference.
    #[serde(default)]
    pub image_url: Option<String>,
    /// `CAMERA` (the default), `MANUAL` or `SYSTEM`.
    #[serde(default)]
    pub source: Option<String>,
}

/// A lane crossing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneEventInfo {
    /// Zone of the lane.
    pub zone_id: Option<i64>,
    /// Lane crossed.
    pub lane_id: Option<i64>,
    /// Crossing time.
    pub time: String,
    /// Snapshot reference.
    pub image_url: Option<String>,
    /// Event origin.
    pub source: String,
}

/// A discount applied at settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscountInfo {
    /// Reduction policy applied, if any.
    #[serde(default)]
    pub policy_id: Option<i64>,
    /// Display label.
    pub name: String,
    /// Amount taken off.
    pub amount: i64,
}

/// API request to open a session for a vehicle entering a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSessionRequest {
    /// Vehicle plate.
    pub car_number: String,
    /// Entry crossing.
    #[serde(default)]
    pub entry: LaneEventRequest,
    /// Vehicle class.
    #[serde(default)]
    pub vehicle_type: Option<String>,
    /// Operator note.
    #[serde(default)]
    pub note: Option<String>,
}

/// API request to change an active session.
///
/// Only the fields below can change. Plate, entry context, vehicle type and
/// timestamps sent by a client are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSessionRequest {
    /// Exit crossing.
    #[serde(default)]
    pub exit: Option<LaneEventRequest>,
    /// Total fee.
    #[serde(default)]
    pub total_fee: Option<i64>,
    /// Discount amount.
    #[serde(default)]
    pub discount_fee: Option<i64>,
    /// Paid amount.
    #[serde(default)]
    pub paid_fee: Option<i64>,
    /// Target status.
    #[serde(default)]
    pub status: Option<String>,
    /// Note; a blank string clears it.
    #[serde(default)]
    pub note: Option<String>,
    /// Replacement discount list.
    #[serde(default)]
    pub applied_discounts: Option<Vec<AppliedDiscountInfo>>,
    /// Pre-settlement time (RFC 3339).
    #[serde(default)]
    pub pre_settled_at: Option<String>,
}

/// API request to close a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseSessionRequest {
    /// Exit crossing.
    #[serde(default)]
    pub exit: LaneEventRequest,
    /// Total fee.
    pub total_fee: i64,
    /// Discount amount.
    #[serde(default)]
    pub discount_fee: i64,
    /// Paid amount.
    pub paid_fee: i64,
    /// Discounts behind `discount_fee`.
    #[serde(default)]
    pub applied_discounts: Option<Vec<AppliedDiscountInfo>>,
    /// Operator note.
    #[serde(default)]
    pub note: Option<String>,
    /// Close as `FORCE_COMPLETED`.
    #[serde(default)]
    pub forced: bool,
}

/// Parking session information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// The canonical session identifier.
    pub session_id: i64,
    /// Site of the visit.
    pub site_id: i64,
    /// Normalized plate.
    pub car_number: String,
    /// Entry crossing.
    pub entry: LaneEventInfo,
    /// Exit crossing.
    pub exit: Option<LaneEventInfo>,
    /// Vehicle class.
    pub vehicle_type: Option<String>,
    /// Session status.
    pub status: String,
    /// Total fee.
    pub total_fee: i64,
    /// Discount amount.
    pub discount_fee: i64,
    /// Paid amount.
    pub paid_fee: i64,
    /// Outstanding amount.
    pub remaining_due: i64,
    /// Discounts behind `discount_fee`.
    pub applied_discounts: Vec<AppliedDiscountInfo>,
    /// Operator note.
    pub note: Option<String>,
    /// Pre-settlement time.
    pub pre_settled_at: Option<String>,
    /// Creation time.
    pub created_at: String,
    /// Last modification time.
    pub updated_at: String,
}

/// API response for a session command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTransitionResponse {
    /// The session after the command.
    pub session: SessionInfo,
    /// The event ID of the persisted audit event.
    pub event_id: i64,
}

/// Query parameters for listing sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSessionsQuery {
    /// Restrict to one status.
    #[serde(default)]
    pub status: Option<String>,
    /// Restrict to active sessions.
    #[serde(default)]
    pub active_only: Option<bool>,
    /// Restrict to one plate.
    #[serde(default)]
    pub car_number: Option<String>,
    /// 1-based page.
    #[serde(default)]
    pub page: Option<u32>,
    /// Page size.
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// API response listing sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSessionsResponse {
    /// Sessions on this page, newest entry first.
    pub sessions: Vec<SessionInfo>,
    /// Total matching sessions.
    pub total: u64,
    /// Page served.
    pub page: u32,
    /// Page size used.
    pub per_page: u32,
}

/// API response for an active-session lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSessionResponse {
    /// The site.
    pub site_id: i64,
    /// Normalized plate searched for.
    pub car_number: String,
    /// The active session, if any.
    pub session: Option<SessionInfo>,
}

// ============================================================================
// Statistics & Audit
// ============================================================================

/// Query parameters for site statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsQuery {
    /// Start of the reporting window (RFC 3339).
    #[serde(default)]
    pub day_start: Option<String>,
    /// Site-local day to report on, `YYYY-MM-DD`. Ignored with `day_start`.
    #[serde(default)]
    pub date: Option<String>,
}

/// Session counts by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCountsInfo {
    /// `PENDING`.
    pub pending: u64,
    /// `PRE_SETTLED`.
    pub pre_settled: u64,
    /// `PAYMENT_PENDING`.
    pub payment_pending: u64,
    /// `COMPLETED`.
    pub completed: u64,
    /// `FORCE_COMPLETED`.
    pub force_completed: u64,
}

/// API response with site statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsResponse {
    /// The site.
    pub site_id: i64,
    /// Start of the reporting window.
    pub day_start: String,
    /// Sessions that entered since `day_start`.
    pub entries: u64,
    /// Sessions that exited since `day_start`.
    pub exits: u64,
    /// Vehicles currently inside.
    pub currently_parked: u64,
    /// Paid amounts of sessions closed since `day_start`.
    pub settled_revenue: i64,
    /// Settled revenue plus what parked vehicles still owe.
    pub projected_revenue: i64,
    /// Status breakdown.
    pub by_status: StatusCountsInfo,
}

/// Query parameters for paged lists without other filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// 1-based page.
    #[serde(default)]
    pub page: Option<u32>,
    /// Page size.
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// Audit event information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEventInfo {
    /// The canonical event identifier.
    pub event_id: i64,
    /// Site the event belongs to.
    pub site_id: Option<i64>,
    /// Who acted.
    pub actor_id: String,
    /// Actor kind.
    pub actor_type: String,
    /// Request or trigger identifier.
    pub cause_id: String,
    /// Why the action happened.
    pub cause_description: String,
    /// Action name.
    pub action_name: String,
    /// Action details.
    pub action_details: Option<String>,
    /// State before the action.
    pub before_snapshot: String,
    /// State after the action.
    pub after_snapshot: String,
    /// When the event was recorded.
    pub created_at: String,
}

/// API response listing audit events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAuditEventsResponse {
    /// Events on this page, newest first.
    pub events: Vec<AuditEventInfo>,
    /// Total events of the site.
    pub total: u64,
    /// Page served.
    pub page: u32,
    /// Page size used.
    pub per_page: u32,
}

// ============================================================================
// Conversions
// ============================================================================

/// Renders a timestamp for a response.
///
/// Years outside four digits fall back to the RFC 3339-like `Display` form.
pub(crate) fn render_timestamp(value: OffsetDateTime) -> String {
    format_timestamp(value).unwrap_or_else(|_| value.to_string())
}

impl From<&Site> for SiteInfo {
    fn from(site: &Site) -> Self {
        Self {
            site_id: site.site_id,
            name: site.name.clone(),
            timezone: site.timezone.clone(),
            address: site.address.clone(),
        }
    }
}

impl From<&Zone> for ZoneInfo {
    fn from(zone: &Zone) -> Self {
        Self {
            zone_id: zone.zone_id,
            site_id: zone.site_id,
            name: zone.name.clone(),
        }
    }
}

impl From<&Lane> for LaneInfo {
    fn from(lane: &Lane) -> Self {
        Self {
            lane_id: lane.lane_id,
            zone_id: lane.zone_id,
            name: lane.name.clone(),
            direction: lane.direction.as_str().to_string(),
        }
    }
}

impl From<&DeviceController> for ControllerInfo {
    fn from(controller: &DeviceController) -> Self {
        Self {
            controller_id: controller.controller_id,
            site_id: controller.site_id,
            name: controller.name.clone(),
            host: controller.host.clone(),
            port: controller.port,
        }
    }
}

impl From<&Device> for DeviceInfo {
    fn from(device: &Device) -> Self {
        Self {
            device_id: device.device_id,
            site_id: device.site_id,
            lane_id: device.lane_id,
            controller_id: device.controller_id,
            name: device.name.clone(),
            kind: device.kind.as_str().to_string(),
        }
    }
}

impl From<&LaneNode> for LaneTreeInfo {
    fn from(node: &LaneNode) -> Self {
        Self {
            lane: LaneInfo::from(&node.lane),
            devices: node.devices.iter().map(DeviceInfo::from).collect(),
        }
    }
}

impl From<&ZoneNode> for ZoneTreeInfo {
    fn from(node: &ZoneNode) -> Self {
        Self {
            zone: ZoneInfo::from(&node.zone),
            lanes: node.lanes.iter().map(LaneTreeInfo::from).collect(),
        }
    }
}

impl From<&SiteTree> for SiteTreeResponse {
    fn from(tree: &SiteTree) -> Self {
        Self {
            site: SiteInfo::from(&tree.site),
            controllers: tree.controllers.iter().map(ControllerInfo::from).collect(),
            zones: tree.zones.iter().map(ZoneTreeInfo::from).collect(),
            unassigned_devices: tree.unassigned_devices.iter().map(DeviceInfo::from).collect(),
        }
    }
}

impl TryFrom<&Policy> for PolicyInfo {
    type Error = DomainError;

    fn try_from(policy: &Policy) -> Result<Self, Self::Error> {
        Ok(Self {
            policy_id: policy.policy_id,
            site_id: policy.site_id,
            policy_type: policy.policy_type().as_str().to_string(),
            name: policy.name.clone(),
            code: policy.code.clone(),
            config: policy.config.to_value()?,
            is_system: policy.is_system,
            is_selected: policy.is_selected(),
            created_at: render_timestamp(policy.created_at),
            updated_at: render_timestamp(policy.updated_at),
        })
    }
}

impl From<&Holiday> for HolidayInfo {
    fn from(holiday: &Holiday) -> Self {
        Self {
            holiday_id: holiday.holiday_id,
            site_id: holiday.site_id,
            name: holiday.name.clone(),
            date: format_date(holiday.date),
            is_recurring: holiday.is_recurring,
        }
    }
}

impl From<&Member> for MemberInfo {
    fn from(member: &Member) -> Self {
        Self {
            member_id: member.member_id,
            site_id: member.site_id,
            name: member.name.clone(),
            car_number: member.car_number.clone(),
            phone: member.phone.clone(),
        }
    }
}

impl From<&PaymentHistory> for PaymentInfo {
    fn from(payment: &PaymentHistory) -> Self {
        Self {
            history_id: payment.history_id,
            member_id: payment.member_id,
            policy_id: payment.policy_id,
            amount: payment.amount,
            status: payment.status.as_str().to_string(),
            start_date: format_date(payment.start_date),
            end_date: format_date(payment.end_date),
            paid_at: render_timestamp(payment.paid_at),
        }
    }
}

impl From<&LaneContext> for LaneEventInfo {
    fn from(context: &LaneContext) -> Self {
        Self {
            zone_id: context.zone_id,
            lane_id: context.lane_id,
            time: render_timestamp(context.time),
            image_url: context.image_url.clone(),
            source: context.source.as_str().to_string(),
        }
    }
}

impl From<&AppliedDiscount> for AppliedDiscountInfo {
    fn from(discount: &AppliedDiscount) -> Self {
        Self {
            policy_id: discount.policy_id,
            name: discount.name.clone(),
            amount: discount.amount,
        }
    }
}

impl From<&AppliedDiscountInfo> for AppliedDiscount {
    fn from(discount: &AppliedDiscountInfo) -> Self {
        Self {
            policy_id: discount.policy_id,
            name: discount.name.clone(),
            amount: discount.amount,
        }
    }
}

impl From<&ParkingSession> for SessionInfo {
    fn from(session: &ParkingSession) -> Self {
        Self {
            session_id: session.session_id,
            site_id: session.site_id,
            car_number: session.car_number.clone(),
            entry: LaneEventInfo::from(&session.entry),
            exit: session.exit.as_ref().map(LaneEventInfo::from),
            vehicle_type: session.vehicle_type.clone(),
            status: session.status.as_str().to_string(),
            total_fee: session.total_fee,
            discount_fee: session.discount_fee,
            paid_fee: session.paid_fee,
            remaining_due: session.remaining_due(),
            applied_discounts: session
                .applied_discounts
                .iter()
                .map(AppliedDiscountInfo::from)
                .collect(),
            note: session.note.clone(),
            pre_settled_at: session.pre_settled_at.map(render_timestamp),
            created_at: render_timestamp(session.created_at),
            updated_at: render_timestamp(session.updated_at),
        }
    }
}

impl From<&StatusCounts> for StatusCountsInfo {
    fn from(counts: &StatusCounts) -> Self {
        Self {
            pending: counts.pending,
            pre_settled: counts.pre_settled,
            payment_pending: counts.payment_pending,
            completed: counts.completed,
            force_completed: counts.force_completed,
        }
    }
}

impl StatisticsResponse {
    #[must_use]
    pub(crate) fn new(site_id: i64, stats: &SiteStatistics) -> Self {
        Self {
            site_id,
            day_start: render_timestamp(stats.day_start),
            entries: stats.entries,
            exits: stats.exits,
            currently_parked: stats.currently_parked,
            settled_revenue: stats.settled_revenue,
            projected_revenue: stats.projected_revenue,
            by_status: StatusCountsInfo::from(&stats.by_status),
        }
    }
}

impl From<&AuditEventRecord> for AuditEventInfo {
    fn from(record: &AuditEventRecord) -> Self {
        Self {
            event_id: record.event_id,
            site_id: record.event.site_id,
            actor_id: record.event.actor.id.clone(),
            actor_type: record.event.actor.actor_type.clone(),
            cause_id: record.event.cause.id.clone(),
            cause_description: record.event.cause.description.clone(),
            action_name: record.event.action.name.clone(),
            action_details: record.event.action.details.clone(),
            before_snapshot: record.event.before.data.clone(),
            after_snapshot: record.event.after.data.clone(),
            created_at: render_timestamp(record.created_at),
        }
    }
}
