// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Parking session queries.

use diesel::SqliteConnection;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use parkops_domain::{
    ACTIVE_STATUSES, AppliedDiscount, EventSource, LaneContext, Page, PageRequest,
    ParkingSession, SessionFilter, SessionStatus,
};
use tracing::debug;

use crate::diesel_schema::parking_sessions;
use crate::error::PersistenceError;
use crate::queries::{stored_count, stored_timestamp};

/// Diesel Queryable struct for parking session rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = parking_sessions)]
pub(crate) struct SessionRow {
    session_id: i64,
    site_id: i64,
    car_number: String,
    entry_zone_id: Option<i64>,
    entry_lane_id: Option<i64>,
    entry_time: String,
    entry_image_url: Option<String>,
    entry_source: String,
    exit_zone_id: Option<i64>,
    exit_lane_id: Option<i64>,
    exit_time: Option<String>,
    exit_image_url: Option<String>,
    exit_source: Option<String>,
    vehicle_type: Option<String>,
    status: String,
    total_fee: i64,
    discount_fee: i64,
    paid_fee: i64,
    applied_discounts: String,
    note: Option<String>,
    pre_settled_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn stored_source(value: &str) -> Result<EventSource, PersistenceError> {
    value
        .parse::<EventSource>()
        .map_err(|e| PersistenceError::corrupt(&e))
}

pub(crate) fn stored_status(value: &str) -> Result<SessionStatus, PersistenceError> {
    value
        .parse::<SessionStatus>()
        .map_err(|e| PersistenceError::corrupt(&e))
}

impl TryFrom<SessionRow> for ParkingSession {
    type Error = PersistenceError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let entry = LaneContext {
            zone_id: row.entry_zone_id,
            lane_id: row.entry_lane_id,
            time: stored_timestamp(&row.entry_time)?,
            image_url: row.entry_image_url,
            source: stored_source(&row.entry_source)?,
        };

        let exit: Option<LaneContext> = match (row.exit_time, row.exit_source) {
            (Some(time), Some(source)) => Some(LaneContext {
                zone_id: row.exit_zone_id,
                lane_id: row.exit_lane_id,
                time: stored_timestamp(&time)?,
                image_url: row.exit_image_url,
                source: stored_source(&source)?,
            }),
            (None, None) => None,
            _ => {
                return Err(PersistenceError::CorruptRow(format!(
                    "session {} has a partial exit context",
                    row.session_id
                )));
            }
        };

        let applied_discounts: Vec<AppliedDiscount> =
            serde_json::from_str(&row.applied_discounts)?;

        Ok(Self {
            session_id: row.session_id,
            site_id: row.site_id,
            car_number: row.car_number,
            entry,
            exit,
            vehicle_type: row.vehicle_type,
            status: stored_status(&row.status)?,
            total_fee: row.total_fee,
            discount_fee: row.discount_fee,
            paid_fee: row.paid_fee,
            applied_discounts,
            note: row.note,
            pre_settled_at: row
                .pre_settled_at
                .as_deref()
                .map(stored_timestamp)
                .transpose()?,
            created_at: stored_timestamp(&row.created_at)?,
            updated_at: stored_timestamp(&row.updated_at)?,
        })
    }
}

pub(crate) fn active_status_names() -> Vec<&'static str> {
    ACTIVE_STATUSES.iter().map(SessionStatus::as_str).collect()
}

/// Retrieves a session by ID.
///
/// # Errors
///
/// Returns an error if the database query fails or the row is corrupt.
pub fn get_session(
    conn: &mut SqliteConnection,
    session_id: i64,
) -> Result<Option<ParkingSession>, PersistenceError> {
    let row: Option<SessionRow> = parking_sessions::table
        .filter(parking_sessions::session_id.eq(session_id))
        .select(SessionRow::as_select())
        .first(conn)
        .optional()?;
    row.map(ParkingSession::try_from).transpose()
}

/// Finds the most recent active session of a vehicle at a site.
///
/// # Errors
///
/// Returns an error if the database query fails or the row is corrupt.
pub fn find_active_session(
    conn: &mut SqliteConnection,
    site_id: i64,
    car_number: &str,
) -> Result<Option<ParkingSession>, PersistenceError> {
    debug!(site_id, car_number, "Looking up active session");
    let row: Option<SessionRow> = parking_sessions::table
        .filter(parking_sessions::site_id.eq(site_id))
        .filter(parking_sessions::car_number.eq(car_number))
        .filter(parking_sessions::status.eq_any(active_status_names()))
        .select(SessionRow::as_select())
        .order((
            parking_sessions::entry_time.desc(),
            parking_sessions::session_id.desc(),
        ))
        .first(conn)
        .optional()?;
    row.map(ParkingSession::try_from).transpose()
}

fn filtered<'a>(site_id: i64, filter: &SessionFilter) -> parking_sessions::BoxedQuery<'a, Sqlite> {
    let mut query = parking_sessions::table
        .filter(parking_sessions::site_id.eq(site_id))
        .into_boxed();
    if let Some(status) = filter.status {
        query = query.filter(parking_sessions::status.eq(status.as_str()));
    }
    if filter.active_only {
        query = query.filter(parking_sessions::status.eq_any(active_status_names()));
    }
    if let Some(car_number) = filter.car_number.clone() {
        query = query.filter(parking_sessions::car_number.eq(car_number));
    }
    query
}

/// Lists the sessions of a site, newest entry first, paged.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_sessions(
    conn: &mut SqliteConnection,
    site_id: i64,
    filter: &SessionFilter,
    page: PageRequest,
) -> Result<Page<ParkingSession>, PersistenceError> {
    let total: i64 = filtered(site_id, filter).count().get_result(conn)?;
    let rows: Vec<SessionRow> = filtered(site_id, filter)
        .select(SessionRow::as_select())
        .order((
            parking_sessions::entry_time.desc(),
            parking_sessions::session_id.desc(),
        ))
        .limit(page.limit())
        .offset(page.offset())
        .load(conn)?;
    let items: Vec<ParkingSession> = rows
        .into_iter()
        .map(ParkingSession::try_from)
        .collect::<Result<_, _>>()?;
    Ok(Page::new(items, stored_count(total)?, page))
}
