// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API boundary for the parking operations core.
//!
//! This crate turns raw client input into validated domain values, drives
//! the persistence layer, and translates every lower-layer error into the
//! `ApiError` taxonomy. Transport concerns (HTTP routing, status codes,
//! WebSocket fan-out) live in the server crate.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod error;
mod handlers;
mod request_response;

#[cfg(test)]
mod tests;

pub use error::{
    ApiError, translate_core_error, translate_domain_error, translate_persistence_error,
};
pub use handlers::{
    DEFAULT_TIMEZONE, assign_devices_to_lane, cancel_payment, close_session, create_controller,
    create_device, create_holiday, create_lane, create_member, create_payment, create_policy,
    create_site, create_zone, delete_controller, delete_device, delete_holiday, delete_lane,
    delete_member, delete_policy, delete_site, delete_zone, effective_membership,
    find_active_session, find_member_by_car_number, get_audit_event, get_controller, get_device,
    get_holiday, get_lane, get_member, get_payment, get_policy, get_selected_blacklist,
    get_session, get_site, get_site_tree, get_statistics, get_zone, is_holiday,
    list_audit_events, list_controllers, list_devices, list_holidays, list_lanes, list_members,
    list_payments, list_policies, list_sessions, list_sites, list_zones, open_session,
    reset_policies, select_blacklist_policy, toggle_controller_site, update_controller,
    update_device, update_holiday, update_lane, update_member, update_policy, update_session,
    update_site, update_zone,
};
pub use request_response::{
    ActiveSessionResponse, AppliedDiscountInfo, AssignDevicesRequest, AssignDevicesResponse,
    AuditEventInfo, CarNumberQuery, CloseSessionRequest, ControllerInfo, CreateControllerRequest,
    CreatePaymentRequest, CreatePolicyRequest, CreateSiteRequest, DeviceInfo, DeviceRequest,
    EffectiveMembershipInfo, EffectiveMembershipQuery, EffectiveMembershipResponse, HolidayInfo,
    HolidayRequest, IsHolidayQuery, IsHolidayResponse, LaneEventInfo, LaneEventRequest, LaneInfo,
    LaneRequest, LaneTreeInfo, ListAuditEventsResponse, ListControllersQuery,
    ListControllersResponse, ListDevicesResponse, ListHolidaysQuery, ListHolidaysResponse,
    ListLanesResponse, ListMembersResponse, ListPaymentsResponse, ListPoliciesQuery,
    ListPoliciesResponse, ListSessionsQuery, ListSessionsResponse, ListSitesResponse,
    ListZonesResponse, MemberInfo, MemberRequest, OpenSessionRequest, PageQuery, PaymentInfo,
    PolicyInfo, ResetPoliciesRequest, ResetPoliciesResponse, SelectBlacklistRequest,
    SelectBlacklistResponse, SelectedBlacklistResponse, SessionInfo, SessionTransitionResponse,
    SiteInfo, SiteTreeResponse, StatisticsQuery, StatisticsResponse, StatusCountsInfo,
    ToggleControllerResponse, UpdateControllerRequest, UpdatePolicyRequest, UpdateSessionRequest,
    UpdateSiteRequest, ZoneInfo, ZoneRequest, ZoneTreeInfo,
};
