// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Holiday mutations.
//!
//! Conflicts are checked before writing so the caller gets the colliding
//! holiday back. The storage triggers enforce the same rule as a backstop.

use diesel::SqliteConnection;
use diesel::prelude::*;
use parkops_domain::{Holiday, find_conflicting_holiday, format_date, month_day_key};
use time::Date;
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::diesel_schema::holidays;
use crate::error::PersistenceError;
use crate::mutations::now_timestamp;
use crate::queries::calendar::{get_holiday, list_holidays_on_month_day};

fn check_conflict(
    conn: &mut SqliteConnection,
    site_id: i64,
    date: Date,
    recurring: bool,
    ignore_holiday_id: Option<i64>,
) -> Result<(), PersistenceError> {
    let existing: Vec<Holiday> = list_holidays_on_month_day(conn, site_id, date)?
        .into_iter()
        .filter(|h| Some(h.holiday_id) != ignore_holiday_id)
        .collect();
    match find_conflicting_holiday(date, recurring, &existing) {
        Some(conflict) => Err(PersistenceError::HolidayConflict(Box::new(conflict.clone()))),
        None => Ok(()),
    }
}

fn reload(conn: &mut SqliteConnection, holiday_id: i64) -> Result<Holiday, PersistenceError> {
    get_holiday(conn, holiday_id)?.ok_or(PersistenceError::NotFound {
        entity: "holiday",
        id: holiday_id,
    })
}

/// Creates a holiday.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `site_id` - The owning site
/// * `name` - Validated holiday name
/// * `date` - The holiday date; only month and day matter when recurring
/// * `recurring` - Whether the holiday repeats every year
///
/// # Errors
///
/// Returns `PersistenceError::HolidayConflict` if the day is already taken,
/// or `PersistenceError::ParentNotFound` if the site does not exist.
pub fn create_holiday(
    conn: &mut SqliteConnection,
    site_id: i64,
    name: &str,
    date: Date,
    recurring: bool,
) -> Result<Holiday, PersistenceError> {
    conn.immediate_transaction(|conn| {
        check_conflict(conn, site_id, date, recurring, None)?;

        diesel::insert_into(holidays::table)
            .values((
                holidays::site_id.eq(site_id),
                holidays::name.eq(name),
                holidays::holiday_date.eq(format_date(date)),
                holidays::month_day.eq(month_day_key(date)),
                holidays::is_recurring.eq(i32::from(recurring)),
                holidays::created_at.eq(now_timestamp()?),
            ))
            .execute(conn)
            .map_err(PersistenceError::on_foreign_key("site", site_id))?;

        let holiday_id: i64 = conn.get_last_insert_rowid()?;
        info!(
            site_id,
            holiday_id,
            date = %format_date(date),
            recurring,
            "Created holiday"
        );
        reload(conn, holiday_id)
    })
}

/// Replaces a holiday's name, date and recurrence.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the holiday does not exist, or
/// `PersistenceError::HolidayConflict` if the new day collides with another
/// holiday of the site.
pub fn update_holiday(
    conn: &mut SqliteConnection,
    holiday_id: i64,
    name: &str,
    date: Date,
    recurring: bool,
) -> Result<Holiday, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let current: Holiday = reload(conn, holiday_id)?;
        check_conflict(conn, current.site_id, date, recurring, Some(holiday_id))?;

        diesel::update(holidays::table.filter(holidays::holiday_id.eq(holiday_id)))
            .set((
                holidays::name.eq(name),
                holidays::holiday_date.eq(format_date(date)),
                holidays::month_day.eq(month_day_key(date)),
                holidays::is_recurring.eq(i32::from(recurring)),
            ))
            .execute(conn)?;

        debug!(holiday_id, date = %format_date(date), recurring, "Updated holiday");
        reload(conn, holiday_id)
    })
}

/// Deletes a holiday.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the holiday does not exist.
pub fn delete_holiday(
    conn: &mut SqliteConnection,
    holiday_id: i64,
) -> Result<(), PersistenceError> {
    let affected: usize =
        diesel::delete(holidays::table.filter(holidays::holiday_id.eq(holiday_id)))
            .execute(conn)?;
    if affected == 0 {
        return Err(PersistenceError::NotFound {
            entity: "holiday",
            id: holiday_id,
        });
    }
    debug!(holiday_id, "Deleted holiday");
    Ok(())
}
