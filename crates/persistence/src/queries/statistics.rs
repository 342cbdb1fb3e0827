// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Dashboard statistics queries.

use diesel::SqliteConnection;
use diesel::prelude::*;
use parkops_domain::{SessionFigures, SiteStatistics, format_timestamp, rollup_statistics};
use time::OffsetDateTime;
use tracing::debug;

use crate::diesel_schema::parking_sessions;
use crate::error::PersistenceError;
use crate::queries::sessions::{active_status_names, stored_status};
use crate::queries::stored_timestamp;

/// Diesel Queryable struct for the session columns statistics need.
#[derive(Queryable, Selectable)]
#[diesel(table_name = parking_sessions)]
struct FiguresRow {
    status: String,
    entry_time: String,
    exit_time: Option<String>,
    total_fee: i64,
    discount_fee: i64,
    paid_fee: i64,
}

impl TryFrom<FiguresRow> for SessionFigures {
    type Error = PersistenceError;

    fn try_from(row: FiguresRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: stored_status(&row.status)?,
            entry_time: stored_timestamp(&row.entry_time)?,
            exit_time: row.exit_time.as_deref().map(stored_timestamp).transpose()?,
            total_fee: row.total_fee,
            discount_fee: row.discount_fee,
            paid_fee: row.paid_fee,
        })
    }
}

/// Computes traffic and revenue figures for a site since `day_start`.
///
/// Only sessions that entered or exited since `day_start`, or are still
/// active, are loaded.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn get_statistics(
    conn: &mut SqliteConnection,
    site_id: i64,
    day_start: OffsetDateTime,
) -> Result<SiteStatistics, PersistenceError> {
    let since: String = format_timestamp(day_start)?;

    let rows: Vec<FiguresRow> = parking_sessions::table
        .filter(parking_sessions::site_id.eq(site_id))
        .filter(
            parking_sessions::entry_time
                .ge(since.clone())
                .or(parking_sessions::exit_time.ge(since.clone()))
                .or(parking_sessions::status.eq_any(active_status_names())),
        )
        .select(FiguresRow::as_select())
        .load(conn)?;

    let figures: Vec<SessionFigures> = rows
        .into_iter()
        .map(SessionFigures::try_from)
        .collect::<Result<_, _>>()?;
    let stats: SiteStatistics = rollup_statistics(&figures, day_start);

    debug!(
        site_id,
        since = %since,
        entries = stats.entries,
        exits = stats.exits,
        currently_parked = stats.currently_parked,
        "Computed site statistics"
    );
    Ok(stats)
}
