// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! HTTP routes.
//!
//! Every handler takes the shared persistence handle under the request
//! deadline, runs one API operation, and publishes a live event once the
//! write has committed.

use axum::{
    Json, Router,
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    routing::{get, post, put},
};
use parkops_api::{
    ActiveSessionResponse, AssignDevicesRequest, AssignDevicesResponse, AuditEventInfo,
    CarNumberQuery, CloseSessionRequest, ControllerInfo, CreateControllerRequest,
    CreatePaymentRequest, CreatePolicyRequest, CreateSiteRequest, DeviceInfo, DeviceRequest,
    EffectiveMembershipQuery, EffectiveMembershipResponse, HolidayInfo, HolidayRequest,
    IsHolidayQuery, IsHolidayResponse, LaneInfo, LaneRequest, ListAuditEventsResponse,
    ListControllersQuery, ListControllersResponse, ListDevicesResponse, ListHolidaysQuery,
    ListHolidaysResponse, ListLanesResponse, ListMembersResponse, ListPaymentsResponse,
    ListPoliciesQuery, ListPoliciesResponse, ListSessionsQuery, ListSessionsResponse,
    ListSitesResponse, ListZonesResponse, MemberInfo, MemberRequest, OpenSessionRequest,
    PageQuery, PaymentInfo, PolicyInfo, ResetPoliciesRequest, ResetPoliciesResponse,
    SelectBlacklistRequest, SelectBlacklistResponse, SelectedBlacklistResponse, SessionInfo,
    SessionTransitionResponse, SiteInfo, SiteTreeResponse, StatisticsQuery, StatisticsResponse,
    ToggleControllerResponse, UpdateControllerRequest, UpdatePolicyRequest, UpdateSessionRequest,
    UpdateSiteRequest, ZoneInfo, ZoneRequest,
};
use time::OffsetDateTime;
use tracing::info;

use crate::AppState;
use crate::error::HttpError;
use crate::extract::{ApiJson, RequestActor};
use crate::live::{Change, Entity, LiveEvent, live_events_handler};

type Created<T> = (StatusCode, Json<T>);

const fn record(entity: Entity, id: i64, site_id: Option<i64>, change: Change) -> LiveEvent {
    LiveEvent::RecordChanged {
        entity,
        id,
        site_id,
        change,
    }
}

// ============================================================================
// Sites
// ============================================================================

async fn handle_create_site(
    AxumState(state): AxumState<AppState>,
    ApiJson(req): ApiJson<CreateSiteRequest>,
) -> Result<Created<SiteInfo>, HttpError> {
    info!(name = %req.name, "Handling create_site request");
    let site: SiteInfo = parkops_api::create_site(&mut *state.lock().await?, &req)?;
    state.publish(record(
        Entity::Site,
        site.site_id,
        Some(site.site_id),
        Change::Created,
    ));
    Ok((StatusCode::CREATED, Json(site)))
}

async fn handle_list_sites(
    AxumState(state): AxumState<AppState>,
) -> Result<Json<ListSitesResponse>, HttpError> {
    Ok(Json(parkops_api::list_sites(&mut *state.lock().await?)?))
}

async fn handle_get_site(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
) -> Result<Json<SiteInfo>, HttpError> {
    Ok(Json(parkops_api::get_site(&mut *state.lock().await?, site_id)?))
}

async fn handle_update_site(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateSiteRequest>,
) -> Result<Json<SiteInfo>, HttpError> {
    info!(site_id, "Handling update_site request");
    let site: SiteInfo = parkops_api::update_site(&mut *state.lock().await?, site_id, &req)?;
    state.publish(record(Entity::Site, site_id, Some(site_id), Change::Updated));
    Ok(Json(site))
}

async fn handle_delete_site(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    info!(site_id, "Handling delete_site request");
    parkops_api::delete_site(&mut *state.lock().await?, site_id)?;
    state.publish(record(Entity::Site, site_id, Some(site_id), Change::Deleted));
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_get_site_tree(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
) -> Result<Json<SiteTreeResponse>, HttpError> {
    Ok(Json(parkops_api::get_site_tree(
        &mut *state.lock().await?,
        site_id,
    )?))
}

// ============================================================================
// Zones & Lanes
// ============================================================================

async fn handle_create_zone(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    ApiJson(req): ApiJson<ZoneRequest>,
) -> Result<Created<ZoneInfo>, HttpError> {
    info!(site_id, name = %req.name, "Handling create_zone request");
    let zone: ZoneInfo = parkops_api::create_zone(&mut *state.lock().await?, site_id, &req)?;
    state.publish(record(
        Entity::Zone,
        zone.zone_id,
        Some(site_id),
        Change::Created,
    ));
    Ok((StatusCode::CREATED, Json(zone)))
}

async fn handle_list_zones(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
) -> Result<Json<ListZonesResponse>, HttpError> {
    Ok(Json(parkops_api::list_zones(&mut *state.lock().await?, site_id)?))
}

async fn handle_get_zone(
    AxumState(state): AxumState<AppState>,
    Path(zone_id): Path<i64>,
) -> Result<Json<ZoneInfo>, HttpError> {
    Ok(Json(parkops_api::get_zone(&mut *state.lock().await?, zone_id)?))
}

async fn handle_update_zone(
    AxumState(state): AxumState<AppState>,
    Path(zone_id): Path<i64>,
    ApiJson(req): ApiJson<ZoneRequest>,
) -> Result<Json<ZoneInfo>, HttpError> {
    info!(zone_id, "Handling update_zone request");
    let zone: ZoneInfo = parkops_api::update_zone(&mut *state.lock().await?, zone_id, &req)?;
    state.publish(record(
        Entity::Zone,
        zone_id,
        Some(zone.site_id),
        Change::Updated,
    ));
    Ok(Json(zone))
}

async fn handle_delete_zone(
    AxumState(state): AxumState<AppState>,
    Path(zone_id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    info!(zone_id, "Handling delete_zone request");
    parkops_api::delete_zone(&mut *state.lock().await?, zone_id)?;
    state.publish(record(Entity::Zone, zone_id, None, Change::Deleted));
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_create_lane(
    AxumState(state): AxumState<AppState>,
    Path(zone_id): Path<i64>,
    ApiJson(req): ApiJson<LaneRequest>,
) -> Result<Created<LaneInfo>, HttpError> {
    info!(zone_id, name = %req.name, "Handling create_lane request");
    let lane: LaneInfo = parkops_api::create_lane(&mut *state.lock().await?, zone_id, &req)?;
    state.publish(record(Entity::Lane, lane.lane_id, None, Change::Created));
    Ok((StatusCode::CREATED, Json(lane)))
}

async fn handle_list_lanes(
    AxumState(state): AxumState<AppState>,
    Path(zone_id): Path<i64>,
) -> Result<Json<ListLanesResponse>, HttpError> {
    Ok(Json(parkops_api::list_lanes(&mut *state.lock().await?, zone_id)?))
}

async fn handle_get_lane(
    AxumState(state): AxumState<AppState>,
    Path(lane_id): Path<i64>,
) -> Result<Json<LaneInfo>, HttpError> {
    Ok(Json(parkops_api::get_lane(&mut *state.lock().await?, lane_id)?))
}

async fn handle_update_lane(
    AxumState(state): AxumState<AppState>,
    Path(lane_id): Path<i64>,
    ApiJson(req): ApiJson<LaneRequest>,
) -> Result<Json<LaneInfo>, HttpError> {
    info!(lane_id, "Handling update_lane request");
    let lane: LaneInfo = parkops_api::update_lane(&mut *state.lock().await?, lane_id, &req)?;
    state.publish(record(Entity::Lane, lane_id, None, Change::Updated));
    Ok(Json(lane))
}

async fn handle_delete_lane(
    AxumState(state): AxumState<AppState>,
    Path(lane_id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    info!(lane_id, "Handling delete_lane request");
    parkops_api::delete_lane(&mut *state.lock().await?, lane_id)?;
    state.publish(record(Entity::Lane, lane_id, None, Change::Deleted));
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_assign_devices(
    AxumState(state): AxumState<AppState>,
    Path(lane_id): Path<i64>,
    ApiJson(req): ApiJson<AssignDevicesRequest>,
) -> Result<Json<AssignDevicesResponse>, HttpError> {
    info!(
        lane_id,
        count = req.device_ids.len(),
        "Handling assign_devices request"
    );
    let response: AssignDevicesResponse =
        parkops_api::assign_devices_to_lane(&mut *state.lock().await?, lane_id, &req)?;
    state.publish(LiveEvent::LaneDevicesAssigned {
        lane_id,
        device_ids: response.devices.iter().map(|d| d.device_id).collect(),
    });
    Ok(Json(response))
}

// ============================================================================
// Controllers & Devices
// ============================================================================

async fn handle_create_controller(
    AxumState(state): AxumState<AppState>,
    ApiJson(req): ApiJson<CreateControllerRequest>,
) -> Result<Created<ControllerInfo>, HttpError> {
    info!(name = %req.name, "Handling create_controller request");
    let controller: ControllerInfo =
        parkops_api::create_controller(&mut *state.lock().await?, &req)?;
    state.publish(record(
        Entity::Controller,
        controller.controller_id,
        controller.site_id,
        Change::Created,
    ));
    Ok((StatusCode::CREATED, Json(controller)))
}

async fn handle_list_controllers(
    AxumState(state): AxumState<AppState>,
    Query(query): Query<ListControllersQuery>,
) -> Result<Json<ListControllersResponse>, HttpError> {
    Ok(Json(parkops_api::list_controllers(
        &mut *state.lock().await?,
        &query,
    )?))
}

async fn handle_get_controller(
    AxumState(state): AxumState<AppState>,
    Path(controller_id): Path<i64>,
) -> Result<Json<ControllerInfo>, HttpError> {
    Ok(Json(parkops_api::get_controller(
        &mut *state.lock().await?,
        controller_id,
    )?))
}

async fn handle_update_controller(
    AxumState(state): AxumState<AppState>,
    Path(controller_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateControllerRequest>,
) -> Result<Json<ControllerInfo>, HttpError> {
    info!(controller_id, "Handling update_controller request");
    let controller: ControllerInfo =
        parkops_api::update_controller(&mut *state.lock().await?, controller_id, &req)?;
    state.publish(record(
        Entity::Controller,
        controller_id,
        controller.site_id,
        Change::Updated,
    ));
    Ok(Json(controller))
}

async fn handle_delete_controller(
    AxumState(state): AxumState<AppState>,
    Path(controller_id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    info!(controller_id, "Handling delete_controller request");
    parkops_api::delete_controller(&mut *state.lock().await?, controller_id)?;
    state.publish(record(
        Entity::Controller,
        controller_id,
        None,
        Change::Deleted,
    ));
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_toggle_controller(
    AxumState(state): AxumState<AppState>,
    Path((site_id, controller_id)): Path<(i64, i64)>,
    RequestActor(actor, cause): RequestActor,
) -> Result<Json<ToggleControllerResponse>, HttpError> {
    info!(
        site_id,
        controller_id,
        actor_id = %actor.id,
        "Handling toggle_controller request"
    );
    let response: ToggleControllerResponse = parkops_api::toggle_controller_site(
        &mut *state.lock().await?,
        site_id,
        controller_id,
        actor,
        cause,
    )?;
    state.publish(LiveEvent::ControllerToggled {
        controller_id,
        site_id: response.site_id,
        previous_site_id: response.previous_site_id,
    });
    Ok(Json(response))
}

async fn handle_create_device(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    ApiJson(req): ApiJson<DeviceRequest>,
) -> Result<Created<DeviceInfo>, HttpError> {
    info!(site_id, name = %req.name, "Handling create_device request");
    let device: DeviceInfo = parkops_api::create_device(&mut *state.lock().await?, site_id, &req)?;
    state.publish(record(
        Entity::Device,
        device.device_id,
        Some(site_id),
        Change::Created,
    ));
    Ok((StatusCode::CREATED, Json(device)))
}

async fn handle_list_devices(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
) -> Result<Json<ListDevicesResponse>, HttpError> {
    Ok(Json(parkops_api::list_devices(
        &mut *state.lock().await?,
        site_id,
    )?))
}

async fn handle_get_device(
    AxumState(state): AxumState<AppState>,
    Path(device_id): Path<i64>,
) -> Result<Json<DeviceInfo>, HttpError> {
    Ok(Json(parkops_api::get_device(
        &mut *state.lock().await?,
        device_id,
    )?))
}

async fn handle_update_device(
    AxumState(state): AxumState<AppState>,
    Path(device_id): Path<i64>,
    ApiJson(req): ApiJson<DeviceRequest>,
) -> Result<Json<DeviceInfo>, HttpError> {
    info!(device_id, "Handling update_device request");
    let device: DeviceInfo =
        parkops_api::update_device(&mut *state.lock().await?, device_id, &req)?;
    state.publish(record(
        Entity::Device,
        device_id,
        Some(device.site_id),
        Change::Updated,
    ));
    Ok(Json(device))
}

async fn handle_delete_device(
    AxumState(state): AxumState<AppState>,
    Path(device_id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    info!(device_id, "Handling delete_device request");
    parkops_api::delete_device(&mut *state.lock().await?, device_id)?;
    state.publish(record(Entity::Device, device_id, None, Change::Deleted));
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Policies
// ============================================================================

async fn handle_create_policy(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    ApiJson(req): ApiJson<CreatePolicyRequest>,
) -> Result<Created<PolicyInfo>, HttpError> {
    info!(
        site_id,
        policy_type = %req.policy_type,
        name = %req.name,
        "Handling create_policy request"
    );
    let policy: PolicyInfo = parkops_api::create_policy(&mut *state.lock().await?, site_id, &req)?;
    state.publish(record(
        Entity::Policy,
        policy.policy_id,
        Some(site_id),
        Change::Created,
    ));
    Ok((StatusCode::CREATED, Json(policy)))
}

async fn handle_list_policies(
    AxumState(state): AxumState<AppState>,
    Query(query): Query<ListPoliciesQuery>,
) -> Result<Json<ListPoliciesResponse>, HttpError> {
    Ok(Json(parkops_api::list_policies(
        &mut *state.lock().await?,
        &query,
    )?))
}

async fn handle_get_policy(
    AxumState(state): AxumState<AppState>,
    Path(policy_id): Path<i64>,
) -> Result<Json<PolicyInfo>, HttpError> {
    Ok(Json(parkops_api::get_policy(
        &mut *state.lock().await?,
        policy_id,
    )?))
}

async fn handle_update_policy(
    AxumState(state): AxumState<AppState>,
    Path(policy_id): Path<i64>,
    ApiJson(req): ApiJson<UpdatePolicyRequest>,
) -> Result<Json<PolicyInfo>, HttpError> {
    info!(policy_id, "Handling update_policy request");
    let policy: PolicyInfo =
        parkops_api::update_policy(&mut *state.lock().await?, policy_id, &req)?;
    state.publish(record(
        Entity::Policy,
        policy_id,
        Some(policy.site_id),
        Change::Updated,
    ));
    Ok(Json(policy))
}

async fn handle_delete_policy(
    AxumState(state): AxumState<AppState>,
    Path(policy_id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    info!(policy_id, "Handling delete_policy request");
    parkops_api::delete_policy(&mut *state.lock().await?, policy_id)?;
    state.publish(record(Entity::Policy, policy_id, None, Change::Deleted));
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_reset_policies(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    RequestActor(actor, cause): RequestActor,
    ApiJson(req): ApiJson<ResetPoliciesRequest>,
) -> Result<Json<ResetPoliciesResponse>, HttpError> {
    info!(
        site_id,
        count = req.policies.len(),
        actor_id = %actor.id,
        "Handling reset_policies request"
    );
    let response: ResetPoliciesResponse =
        parkops_api::reset_policies(&mut *state.lock().await?, site_id, &req, actor, cause)?;
    state.publish(LiveEvent::PoliciesReset {
        site_id,
        count: response.policies.len(),
    });
    Ok(Json(response))
}

async fn handle_get_selected_blacklist(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
) -> Result<Json<SelectedBlacklistResponse>, HttpError> {
    Ok(Json(parkops_api::get_selected_blacklist(
        &mut *state.lock().await?,
        site_id,
    )?))
}

async fn handle_select_blacklist(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    RequestActor(actor, cause): RequestActor,
    ApiJson(req): ApiJson<SelectBlacklistRequest>,
) -> Result<Json<SelectBlacklistResponse>, HttpError> {
    info!(
        site_id,
        policy_id = req.policy_id,
        actor_id = %actor.id,
        "Handling select_blacklist request"
    );
    let response: SelectBlacklistResponse = parkops_api::select_blacklist_policy(
        &mut *state.lock().await?,
        site_id,
        &req,
        actor,
        cause,
    )?;
    state.publish(LiveEvent::BlacklistSelected {
        site_id,
        policy_id: response.policy.policy_id,
        previous_policy_id: response.previous_policy_id,
    });
    Ok(Json(response))
}

// ============================================================================
// Holidays
// ============================================================================

async fn handle_create_holiday(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    ApiJson(req): ApiJson<HolidayRequest>,
) -> Result<Created<HolidayInfo>, HttpError> {
    info!(site_id, date = %req.date, "Handling create_holiday request");
    let holiday: HolidayInfo =
        parkops_api::create_holiday(&mut *state.lock().await?, site_id, &req)?;
    state.publish(record(
        Entity::Holiday,
        holiday.holiday_id,
        Some(site_id),
        Change::Created,
    ));
    Ok((StatusCode::CREATED, Json(holiday)))
}

async fn handle_list_holidays(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    Query(query): Query<ListHolidaysQuery>,
) -> Result<Json<ListHolidaysResponse>, HttpError> {
    Ok(Json(parkops_api::list_holidays(
        &mut *state.lock().await?,
        site_id,
        &query,
    )?))
}

async fn handle_is_holiday(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    Query(query): Query<IsHolidayQuery>,
) -> Result<Json<IsHolidayResponse>, HttpError> {
    Ok(Json(parkops_api::is_holiday(
        &mut *state.lock().await?,
        site_id,
        &query,
        OffsetDateTime::now_utc(),
    )?))
}

async fn handle_get_holiday(
    AxumState(state): AxumState<AppState>,
    Path(holiday_id): Path<i64>,
) -> Result<Json<HolidayInfo>, HttpError> {
    Ok(Json(parkops_api::get_holiday(
        &mut *state.lock().await?,
        holiday_id,
    )?))
}

async fn handle_update_holiday(
    AxumState(state): AxumState<AppState>,
    Path(holiday_id): Path<i64>,
    ApiJson(req): ApiJson<HolidayRequest>,
) -> Result<Json<HolidayInfo>, HttpError> {
    info!(holiday_id, "Handling update_holiday request");
    let holiday: HolidayInfo =
        parkops_api::update_holiday(&mut *state.lock().await?, holiday_id, &req)?;
    state.publish(record(
        Entity::Holiday,
        holiday_id,
        Some(holiday.site_id),
        Change::Updated,
    ));
    Ok(Json(holiday))
}

async fn handle_delete_holiday(
    AxumState(state): AxumState<AppState>,
    Path(holiday_id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    info!(holiday_id, "Handling delete_holiday request");
    parkops_api::delete_holiday(&mut *state.lock().await?, holiday_id)?;
    state.publish(record(Entity::Holiday, holiday_id, None, Change::Deleted));
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Members & Payments
// ============================================================================

async fn handle_create_member(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    ApiJson(req): ApiJson<MemberRequest>,
) -> Result<Created<MemberInfo>, HttpError> {
    info!(site_id, "Handling create_member request");
    let member: MemberInfo = parkops_api::create_member(&mut *state.lock().await?, site_id, &req)?;
    state.publish(record(
        Entity::Member,
        member.member_id,
        Some(site_id),
        Change::Created,
    ));
    Ok((StatusCode::CREATED, Json(member)))
}

async fn handle_list_members(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListMembersResponse>, HttpError> {
    Ok(Json(parkops_api::list_members(
        &mut *state.lock().await?,
        site_id,
        &query,
    )?))
}

async fn handle_find_member(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    Query(query): Query<CarNumberQuery>,
) -> Result<Json<MemberInfo>, HttpError> {
    Ok(Json(parkops_api::find_member_by_car_number(
        &mut *state.lock().await?,
        site_id,
        &query,
    )?))
}

async fn handle_get_member(
    AxumState(state): AxumState<AppState>,
    Path(member_id): Path<i64>,
) -> Result<Json<MemberInfo>, HttpError> {
    Ok(Json(parkops_api::get_member(
        &mut *state.lock().await?,
        member_id,
    )?))
}

async fn handle_update_member(
    AxumState(state): AxumState<AppState>,
    Path(member_id): Path<i64>,
    ApiJson(req): ApiJson<MemberRequest>,
) -> Result<Json<MemberInfo>, HttpError> {
    info!(member_id, "Handling update_member request");
    let member: MemberInfo =
        parkops_api::update_member(&mut *state.lock().await?, member_id, &req)?;
    state.publish(record(
        Entity::Member,
        member_id,
        Some(member.site_id),
        Change::Updated,
    ));
    Ok(Json(member))
}

async fn handle_delete_member(
    AxumState(state): AxumState<AppState>,
    Path(member_id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    info!(member_id, "Handling delete_member request");
    parkops_api::delete_member(&mut *state.lock().await?, member_id)?;
    state.publish(record(Entity::Member, member_id, None, Change::Deleted));
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_create_payment(
    AxumState(state): AxumState<AppState>,
    Path(member_id): Path<i64>,
    ApiJson(req): ApiJson<CreatePaymentRequest>,
) -> Result<Created<PaymentInfo>, HttpError> {
    info!(
        member_id,
        policy_id = req.policy_id,
        "Handling create_payment request"
    );
    let payment: PaymentInfo = parkops_api::create_payment(
        &mut *state.lock().await?,
        member_id,
        &req,
        OffsetDateTime::now_utc(),
    )?;
    state.publish(record(
        Entity::Payment,
        payment.history_id,
        None,
        Change::Created,
    ));
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn handle_list_payments(
    AxumState(state): AxumState<AppState>,
    Path(member_id): Path<i64>,
) -> Result<Json<ListPaymentsResponse>, HttpError> {
    Ok(Json(parkops_api::list_payments(
        &mut *state.lock().await?,
        member_id,
    )?))
}

async fn handle_effective_membership(
    AxumState(state): AxumState<AppState>,
    Path(member_id): Path<i64>,
    Query(query): Query<EffectiveMembershipQuery>,
) -> Result<Json<EffectiveMembershipResponse>, HttpError> {
    Ok(Json(parkops_api::effective_membership(
        &mut *state.lock().await?,
        member_id,
        &query,
        OffsetDateTime::now_utc(),
    )?))
}

async fn handle_get_payment(
    AxumState(state): AxumState<AppState>,
    Path(history_id): Path<i64>,
) -> Result<Json<PaymentInfo>, HttpError> {
    Ok(Json(parkops_api::get_payment(
        &mut *state.lock().await?,
        history_id,
    )?))
}

async fn handle_cancel_payment(
    AxumState(state): AxumState<AppState>,
    Path(history_id): Path<i64>,
) -> Result<Json<PaymentInfo>, HttpError> {
    info!(history_id, "Handling cancel_payment request");
    let payment: PaymentInfo = parkops_api::cancel_payment(&mut *state.lock().await?, history_id)?;
    state.publish(record(Entity::Payment, history_id, None, Change::Updated));
    Ok(Json(payment))
}

// ============================================================================
// Parking Sessions
// ============================================================================

async fn handle_open_session(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    RequestActor(actor, cause): RequestActor,
    ApiJson(req): ApiJson<OpenSessionRequest>,
) -> Result<Created<SessionTransitionResponse>, HttpError> {
    info!(
        site_id,
        car_number = %req.car_number,
        actor_id = %actor.id,
        "Handling open_session request"
    );
    let response: SessionTransitionResponse = parkops_api::open_session(
        &mut *state.lock().await?,
        site_id,
        &req,
        actor,
        cause,
        OffsetDateTime::now_utc(),
    )?;
    state.publish(LiveEvent::SessionOpened {
        site_id,
        session_id: response.session.session_id,
        car_number: response.session.car_number.clone(),
    });
    Ok((StatusCode::CREATED, Json(response)))
}

async fn handle_list_sessions(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<ListSessionsResponse>, HttpError> {
    Ok(Json(parkops_api::list_sessions(
        &mut *state.lock().await?,
        site_id,
        &query,
    )?))
}

async fn handle_find_active_session(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    Query(query): Query<CarNumberQuery>,
) -> Result<Json<ActiveSessionResponse>, HttpError> {
    Ok(Json(parkops_api::find_active_session(
        &mut *state.lock().await?,
        site_id,
        &query,
    )?))
}

async fn handle_get_session(
    AxumState(state): AxumState<AppState>,
    Path(session_id): Path<i64>,
) -> Result<Json<SessionInfo>, HttpError> {
    Ok(Json(parkops_api::get_session(
        &mut *state.lock().await?,
        session_id,
    )?))
}

async fn handle_update_session(
    AxumState(state): AxumState<AppState>,
    Path(session_id): Path<i64>,
    RequestActor(actor, cause): RequestActor,
    ApiJson(req): ApiJson<UpdateSessionRequest>,
) -> Result<Json<SessionTransitionResponse>, HttpError> {
    info!(session_id, actor_id = %actor.id, "Handling update_session request");
    let response: SessionTransitionResponse = parkops_api::update_session(
        &mut *state.lock().await?,
        session_id,
        &req,
        actor,
        cause,
        OffsetDateTime::now_utc(),
    )?;
    state.publish(LiveEvent::SessionUpdated {
        site_id: response.session.site_id,
        session_id,
        status: response.session.status.clone(),
    });
    Ok(Json(response))
}

async fn handle_close_session(
    AxumState(state): AxumState<AppState>,
    Path(session_id): Path<i64>,
    RequestActor(actor, cause): RequestActor,
    ApiJson(req): ApiJson<CloseSessionRequest>,
) -> Result<Json<SessionTransitionResponse>, HttpError> {
    info!(
        session_id,
        forced = req.forced,
        actor_id = %actor.id,
        "Handling close_session request"
    );
    let response: SessionTransitionResponse = parkops_api::close_session(
        &mut *state.lock().await?,
        session_id,
        &req,
        actor,
        cause,
        OffsetDateTime::now_utc(),
    )?;
    state.publish(LiveEvent::SessionClosed {
        site_id: response.session.site_id,
        session_id,
        status: response.session.status.clone(),
        paid_fee: response.session.paid_fee,
    });
    Ok(Json(response))
}

// ============================================================================
// Statistics & Audit
// ============================================================================

async fn handle_get_statistics(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<StatisticsResponse>, HttpError> {
    Ok(Json(parkops_api::get_statistics(
        &mut *state.lock().await?,
        site_id,
        &query,
        OffsetDateTime::now_utc(),
    )?))
}

async fn handle_list_audit_events(
    AxumState(state): AxumState<AppState>,
    Path(site_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListAuditEventsResponse>, HttpError> {
    Ok(Json(parkops_api::list_audit_events(
        &mut *state.lock().await?,
        site_id,
        &query,
    )?))
}

async fn handle_get_audit_event(
    AxumState(state): AxumState<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<AuditEventInfo>, HttpError> {
    Ok(Json(parkops_api::get_audit_event(
        &mut *state.lock().await?,
        event_id,
    )?))
}

/// Builds the application router with all endpoints.
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/sites", post(handle_create_site).get(handle_list_sites))
        .route(
            "/sites/{site_id}",
            get(handle_get_site)
                .put(handle_update_site)
                .delete(handle_delete_site),
        )
        .route("/sites/{site_id}/tree", get(handle_get_site_tree))
        .route(
            "/sites/{site_id}/zones",
            post(handle_create_zone).get(handle_list_zones),
        )
        .route(
            "/zones/{zone_id}",
            get(handle_get_zone)
                .put(handle_update_zone)
                .delete(handle_delete_zone),
        )
        .route(
            "/zones/{zone_id}/lanes",
            post(handle_create_lane).get(handle_list_lanes),
        )
        .route(
            "/lanes/{lane_id}",
            get(handle_get_lane)
                .put(handle_update_lane)
                .delete(handle_delete_lane),
        )
        .route("/lanes/{lane_id}/devices", put(handle_assign_devices))
        .route(
            "/controllers",
            post(handle_create_controller).get(handle_list_controllers),
        )
        .route(
            "/controllers/{controller_id}",
            get(handle_get_controller)
                .put(handle_update_controller)
                .delete(handle_delete_controller),
        )
        .route(
            "/sites/{site_id}/controllers/{controller_id}/toggle",
            post(handle_toggle_controller),
        )
        .route(
            "/sites/{site_id}/devices",
            post(handle_create_device).get(handle_list_devices),
        )
        .route(
            "/devices/{device_id}",
            get(handle_get_device)
                .put(handle_update_device)
                .delete(handle_delete_device),
        )
        .route("/policies", get(handle_list_policies))
        .route(
            "/policies/{policy_id}",
            get(handle_get_policy)
                .patch(handle_update_policy)
                .delete(handle_delete_policy),
        )
        .route(
            "/sites/{site_id}/policies",
            post(handle_create_policy).put(handle_reset_policies),
        )
        .route(
            "/sites/{site_id}/blacklist",
            get(handle_get_selected_blacklist).put(handle_select_blacklist),
        )
        .route(
            "/sites/{site_id}/holidays",
            post(handle_create_holiday).get(handle_list_holidays),
        )
        .route("/sites/{site_id}/holidays/check", get(handle_is_holiday))
        .route(
            "/holidays/{holiday_id}",
            get(handle_get_holiday)
                .put(handle_update_holiday)
                .delete(handle_delete_holiday),
        )
        .route(
            "/sites/{site_id}/members",
            post(handle_create_member).get(handle_list_members),
        )
        .route("/sites/{site_id}/members/search", get(handle_find_member))
        .route(
            "/members/{member_id}",
            get(handle_get_member)
                .put(handle_update_member)
                .delete(handle_delete_member),
        )
        .route(
            "/members/{member_id}/payments",
            post(handle_create_payment).get(handle_list_payments),
        )
        .route(
            "/members/{member_id}/membership",
            get(handle_effective_membership),
        )
        .route("/payments/{history_id}", get(handle_get_payment))
        .route("/payments/{history_id}/cancel", post(handle_cancel_payment))
        .route(
            "/sites/{site_id}/sessions",
            post(handle_open_session).get(handle_list_sessions),
        )
        .route(
            "/sites/{site_id}/sessions/active",
            get(handle_find_active_session),
        )
        .route(
            "/sessions/{session_id}",
            get(handle_get_session).patch(handle_update_session),
        )
        .route("/sessions/{session_id}/close", post(handle_close_session))
        .route("/sites/{site_id}/statistics", get(handle_get_statistics))
        .route("/sites/{site_id}/audit", get(handle_list_audit_events))
        .route("/audit/{event_id}", get(handle_get_audit_event))
        .route("/live", get(live_events_handler))
        .with_state(app_state)
}
