// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Session command persistence.
//!
//! Each command runs inside one immediate transaction: the current session
//! is read, the core decides the transition, and the row change and its
//! audit event are written together. The partial unique index on active
//! sessions turns a lost check-then-insert race into `ActiveSessionExists`.

use diesel::SqliteConnection;
use diesel::prelude::*;
use parkops::{Command, CoreError, SessionChange, TransitionResult, apply};
use parkops_audit::{Actor, Cause};
use parkops_domain::{LaneContext, NewSession, ParkingSession, SessionStatus, format_timestamp};
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::data_models::SessionTransition;
use crate::diesel_schema::parking_sessions;
use crate::error::PersistenceError;
use crate::mutations::audit::persist_audit_event;
use crate::mutations::now_timestamp;
use crate::queries::sessions::{find_active_session, get_session};
use crate::queries::topology::{get_lane, get_site, get_zone};

fn require_session(
    conn: &mut SqliteConnection,
    session_id: i64,
) -> Result<ParkingSession, PersistenceError> {
    get_session(conn, session_id)?.ok_or(PersistenceError::NotFound {
        entity: "session",
        id: session_id,
    })
}

fn zone_in_site(
    conn: &mut SqliteConnection,
    site_id: i64,
    zone_id: i64,
) -> Result<bool, PersistenceError> {
    Ok(get_zone(conn, zone_id)?.is_some_and(|zone| zone.site_id == site_id))
}

/// Checks a lane crossing against the site's topology.
///
/// A lane must belong to a zone of `site_id`. When the zone is omitted it is
/// taken from the lane; when both are given they must agree.
fn resolve_lane_context(
    conn: &mut SqliteConnection,
    site_id: i64,
    context: &mut LaneContext,
) -> Result<(), PersistenceError> {
    let Some(lane_id) = context.lane_id else {
        return match context.zone_id {
            Some(zone_id) if !zone_in_site(conn, site_id, zone_id)? => {
                Err(PersistenceError::ParentNotFound {
                    entity: "zone",
                    id: zone_id,
                })
            }
            _ => Ok(()),
        };
    };

    let lane_zone_id: Option<i64> = get_lane(conn, lane_id)?.map(|lane| lane.zone_id);
    let owned: bool = lane_zone_id
        .map(|zone_id| zone_in_site(conn, site_id, zone_id))
        .transpose()?
        .unwrap_or(false);
    match (lane_zone_id, context.zone_id) {
        (Some(lane_zone), Some(given)) if owned && given == lane_zone => Ok(()),
        (Some(lane_zone), None) if owned => {
            context.zone_id = Some(lane_zone);
            Ok(())
        }
        _ => Err(PersistenceError::ParentNotFound {
            entity: "lane",
            id: lane_id,
        }),
    }
}

/// Resolves every lane crossing carried by `command` at `site_id`.
fn resolve_command_topology(
    conn: &mut SqliteConnection,
    site_id: i64,
    command: &mut Command,
) -> Result<(), PersistenceError> {
    let context: Option<&mut LaneContext> = match command {
        Command::OpenSession { session } => Some(&mut session.entry),
        Command::AmendSession { patch, .. } => patch.exit.as_mut(),
        Command::CloseSession { exit, .. } => Some(exit),
    };
    context.map_or(Ok(()), |context| resolve_lane_context(conn, site_id, context))
}

fn insert_session(
    conn: &mut SqliteConnection,
    session: &NewSession,
) -> Result<i64, PersistenceError> {
    let now: String = now_timestamp()?;
    let entry: &LaneContext = &session.entry;
    let inserted = diesel::insert_into(parking_sessions::table)
        .values((
            parking_sessions::site_id.eq(session.site_id),
            parking_sessions::car_number.eq(&session.car_number),
            parking_sessions::entry_zone_id.eq(entry.zone_id),
            parking_sessions::entry_lane_id.eq(entry.lane_id),
            parking_sessions::entry_time.eq(format_timestamp(entry.time)?),
            parking_sessions::entry_image_url.eq(entry.image_url.as_deref()),
            parking_sessions::entry_source.eq(entry.source.as_str()),
            parking_sessions::vehicle_type.eq(session.vehicle_type.as_deref()),
            parking_sessions::status.eq(SessionStatus::Pending.as_str()),
            parking_sessions::note.eq(session.note.as_deref()),
            parking_sessions::created_at.eq(&now),
            parking_sessions::updated_at.eq(&now),
        ))
        .execute(conn)
        .map_err(PersistenceError::from);

    match inserted {
        Ok(_) => conn.get_last_insert_rowid(),
        Err(PersistenceError::UniqueViolation(message)) => {
            // Another writer opened a session for the plate first.
            match find_active_session(conn, session.site_id, &session.car_number)? {
                Some(existing) => Err(CoreError::ActiveSessionExists {
                    site_id: session.site_id,
                    car_number: session.car_number.clone(),
                    session_id: existing.session_id,
                }
                .into()),
                None => Err(PersistenceError::UniqueViolation(message)),
            }
        }
        Err(PersistenceError::ForeignKeyViolation(_)) => Err(PersistenceError::ParentNotFound {
            entity: "site",
            id: session.site_id,
        }),
        Err(other) => Err(other),
    }
}

fn update_session(
    conn: &mut SqliteConnection,
    session: &ParkingSession,
) -> Result<(), PersistenceError> {
    let exit: Option<&LaneContext> = session.exit.as_ref();
    let exit_time: Option<String> = exit.map(|e| format_timestamp(e.time)).transpose()?;
    let pre_settled_at: Option<String> = session.pre_settled_at.map(format_timestamp).transpose()?;

    let applied_discounts: String = serde_json::to_string(&session.applied_discounts)?;
    let target =
        parking_sessions::table.filter(parking_sessions::session_id.eq(session.session_id));

    diesel::update(target)
        .set((
            parking_sessions::exit_zone_id.eq(exit.and_then(|e| e.zone_id)),
            parking_sessions::exit_lane_id.eq(exit.and_then(|e| e.lane_id)),
            parking_sessions::exit_time.eq(exit_time),
            parking_sessions::exit_image_url.eq(exit.and_then(|e| e.image_url.as_deref())),
            parking_sessions::exit_source.eq(exit.map(|e| e.source.as_str())),
            parking_sessions::status.eq(session.status.as_str()),
            parking_sessions::total_fee.eq(session.total_fee),
            parking_sessions::discount_fee.eq(session.discount_fee),
            parking_sessions::paid_fee.eq(session.paid_fee),
            parking_sessions::applied_discounts.eq(applied_discounts),
            parking_sessions::note.eq(session.note.as_deref()),
            parking_sessions::pre_settled_at.eq(pre_settled_at),
            parking_sessions::updated_at.eq(now_timestamp()?),
        ))
        .execute(conn)?;
    Ok(())
}

/// Applies a session command and persists its effect with one audit event.
///
/// * `OpenSession` inserts a `PENDING` session unless the plate already has
///   an active session at the site.
/// * `AmendSession` applies a whitelisted patch to an active session.
/// * `CloseSession` completes (or force-completes) an active session.
///
/// Entry and exit crossings are checked against the site's zones and lanes
/// first, and a missing zone is filled in from the lane.
///
/// # Errors
///
/// * `PersistenceError::ParentNotFound` when opening at an unknown site, or
///   when a lane or zone is not part of the session's site.
/// * `PersistenceError::NotFound` when amending or closing an unknown session.
/// * `PersistenceError::Rejected` with `ActiveSessionExists`, or with a
///   domain violation for terminal sessions, invalid status changes and
///   negative fees.
pub fn apply_session_command(
    conn: &mut SqliteConnection,
    mut command: Command,
    actor: Actor,
    cause: Cause,
) -> Result<SessionTransition, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let (current, site_id): (Option<ParkingSession>, i64) = match &command {
            Command::OpenSession { session } => {
                if get_site(conn, session.site_id)?.is_none() {
                    return Err(PersistenceError::ParentNotFound {
                        entity: "site",
                        id: session.site_id,
                    });
                }
                let active = find_active_session(conn, session.site_id, &session.car_number)?;
                (active, session.site_id)
            }
            Command::AmendSession { session_id, .. } | Command::CloseSession { session_id, .. } => {
                let existing: ParkingSession = require_session(conn, *session_id)?;
                let site_id: i64 = existing.site_id;
                (Some(existing), site_id)
            }
        };
        resolve_command_topology(conn, site_id, &mut command)?;

        let action: &'static str = command.action_name();
        let result: TransitionResult = apply(current.as_ref(), command, actor, cause)?;

        let session_id: i64 = match &result.change {
            SessionChange::Insert(new_session) => insert_session(conn, new_session)?,
            SessionChange::Update(session) => {
                update_session(conn, session)?;
                session.session_id
            }
        };

        let event_id: i64 = persist_audit_event(conn, &result.audit_event)?;
        let session: ParkingSession = require_session(conn, session_id)?;

        info!(
            session_id,
            site_id = session.site_id,
            car_number = %session.car_number,
            status = session.status.as_str(),
            action,
            "Applied session command"
        );
        debug!(event_id, "Session transition audited");
        Ok(SessionTransition { session, event_id })
    })
}
