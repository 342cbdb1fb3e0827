// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Holiday queries.

use diesel::SqliteConnection;
use diesel::prelude::*;
use parkops_domain::{Holiday, format_date, is_holiday, month_day_key};
use time::Date;
use tracing::debug;

use crate::diesel_schema::holidays;
use crate::error::PersistenceError;
use crate::queries::{stored_date, stored_flag};

/// Diesel Queryable struct for holiday rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = holidays)]
pub(crate) struct HolidayRow {
    holiday_id: i64,
    site_id: i64,
    name: String,
    holiday_date: String,
    is_recurring: i32,
}

impl TryFrom<HolidayRow> for Holiday {
    type Error = PersistenceError;

    fn try_from(row: HolidayRow) -> Result<Self, Self::Error> {
        Ok(Self {
            holiday_id: row.holiday_id,
            site_id: row.site_id,
            name: row.name,
            date: stored_date(&row.holiday_date)?,
            is_recurring: stored_flag(row.is_recurring),
        })
    }
}

/// Retrieves a holiday by ID.
///
/// # Errors
///
/// Returns an error if the database query fails or the row is corrupt.
pub fn get_holiday(
    conn: &mut SqliteConnection,
    holiday_id: i64,
) -> Result<Option<Holiday>, PersistenceError> {
    let row: Option<HolidayRow> = holidays::table
        .filter(holidays::holiday_id.eq(holiday_id))
        .select(HolidayRow::as_select())
        .first(conn)
        .optional()?;
    row.map(Holiday::try_from).transpose()
}

/// Lists the holidays of a site, optionally only those that fall in `year`.
///
/// Recurring holidays fall in every year.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_holidays(
    conn: &mut SqliteConnection,
    site_id: i64,
    year: Option<i32>,
) -> Result<Vec<Holiday>, PersistenceError> {
    let mut query = holidays::table
        .filter(holidays::site_id.eq(site_id))
        .select(HolidayRow::as_select())
        .order((holidays::month_day.asc(), holidays::holiday_date.asc()))
        .into_boxed();
    if let Some(year) = year {
        let prefix: String = format!("{year:04}-%");
        query = query.filter(
            holidays::is_recurring
                .eq(1)
                .or(holidays::holiday_date.like(prefix)),
        );
    }
    let rows: Vec<HolidayRow> = query.load(conn)?;
    rows.into_iter().map(Holiday::try_from).collect()
}

/// Lists the holidays of a site sharing the month and day of `date`.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_holidays_on_month_day(
    conn: &mut SqliteConnection,
    site_id: i64,
    date: Date,
) -> Result<Vec<Holiday>, PersistenceError> {
    let rows: Vec<HolidayRow> = holidays::table
        .filter(holidays::site_id.eq(site_id))
        .filter(holidays::month_day.eq(month_day_key(date)))
        .select(HolidayRow::as_select())
        .order(holidays::holiday_id.asc())
        .load(conn)?;
    rows.into_iter().map(Holiday::try_from).collect()
}

/// Whether `date` is a holiday at the site.
///
/// Matches a one-time holiday on the exact date or a recurring holiday on
/// the same month and day.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn is_site_holiday(
    conn: &mut SqliteConnection,
    site_id: i64,
    date: Date,
) -> Result<bool, PersistenceError> {
    let candidates: Vec<Holiday> = list_holidays_on_month_day(conn, site_id, date)?;
    let result: bool = is_holiday(&candidates, date);
    debug!(site_id, date = %format_date(date), result, "Holiday lookup");
    Ok(result)
}
