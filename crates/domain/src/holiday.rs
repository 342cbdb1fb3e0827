// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Holiday calendar rules.
//!
//! A recurring holiday occupies its month-day in every year. A one-time
//! holiday occupies exactly its concrete date. No two holidays of a site may
//! land on the same calendar day of the same year.

use time::Date;

/// A site holiday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holiday {
    /// Canonical identifier.
    pub holiday_id: i64,
    /// Owning site.
    pub site_id: i64,
    /// Display name.
    pub name: String,
    /// The date. Only month and day are significant for recurring holidays.
    pub date: Date,
    /// Whether the holiday repeats every year.
    pub is_recurring: bool,
}

/// Returns the `MM-DD` key used to group holidays by month and day.
#[must_use]
pub fn month_day_key(date: Date) -> String {
    format!("{:02}-{:02}", u8::from(date.month()), date.day())
}

fn same_month_day(a: Date, b: Date) -> bool {
    a.month() == b.month() && a.day() == b.day()
}

/// Whether `holiday` falls on `date`.
///
/// Recurring holidays match on month-day; one-time holidays match only the
/// exact date.
#[must_use]
pub fn holiday_matches(holiday: &Holiday, date: Date) -> bool {
    if holiday.is_recurring {
        same_month_day(holiday.date, date)
    } else {
        holiday.date == date
    }
}

/// Whether any of `holidays` falls on `date`.
#[must_use]
pub fn is_holiday(holidays: &[Holiday], date: Date) -> bool {
    holidays.iter().any(|h| holiday_matches(h, date))
}

/// Finds the first stored holiday that a candidate would collide with.
///
/// `existing` may contain holidays on any day; only those sharing the
/// candidate's month-day are considered.
///
/// * A recurring candidate conflicts with every holiday on its month-day.
/// * A one-time candidate conflicts with a recurring holiday on its
///   month-day, or with a one-time holiday on the identical date. One-time
///   holidays on the same month-day in different years coexist.
#[must_use]
pub fn find_conflicting_holiday(
    candidate_date: Date,
    candidate_recurring: bool,
    existing: &[Holiday],
) -> Option<&Holiday> {
    existing
        .iter()
        .filter(|h| same_month_day(h.date, candidate_date))
        .find(|h| candidate_recurring || h.is_recurring || h.date == candidate_date)
}
