// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Member and payment history queries.

use diesel::SqliteConnection;
use diesel::prelude::*;
use parkops_domain::{
    EffectiveMembership, Member, Page, PageRequest, PaymentHistory, PaymentStatus,
    find_effective_history,
};
use time::Date;
use tracing::debug;

use crate::diesel_schema::{member_payment_histories, members};
use crate::error::PersistenceError;
use crate::queries::{stored_count, stored_date, stored_timestamp};

/// Diesel Queryable struct for member rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = members)]
pub(crate) struct MemberRow {
    member_id: i64,
    site_id: i64,
    name: String,
    car_number: String,
    phone: Option<String>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Self {
            member_id: row.member_id,
            site_id: row.site_id,
            name: row.name,
            car_number: row.car_number,
            phone: row.phone,
        }
    }
}

/// Diesel Queryable struct for payment history rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = member_payment_histories)]
pub(crate) struct PaymentRow {
    history_id: i64,
    member_id: i64,
    policy_id: i64,
    amount: i64,
    status: String,
    start_date: String,
    end_date: String,
    paid_at: String,
}

impl TryFrom<PaymentRow> for PaymentHistory {
    type Error = PersistenceError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            history_id: row.history_id,
            member_id: row.member_id,
            policy_id: row.policy_id,
            amount: row.amount,
            status: row
                .status
                .parse::<PaymentStatus>()
                .map_err(|e| PersistenceError::corrupt(&e))?,
            start_date: stored_date(&row.start_date)?,
            end_date: stored_date(&row.end_date)?,
            paid_at: stored_timestamp(&row.paid_at)?,
        })
    }
}

/// Retrieves a member by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_member(
    conn: &mut SqliteConnection,
    member_id: i64,
) -> Result<Option<Member>, PersistenceError> {
    let row: Option<MemberRow> = members::table
        .filter(members::member_id.eq(member_id))
        .select(MemberRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row.map(Member::from))
}

/// Retrieves a member by normalized plate.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn find_member_by_car_number(
    conn: &mut SqliteConnection,
    site_id: i64,
    car_number: &str,
) -> Result<Option<Member>, PersistenceError> {
    let row: Option<MemberRow> = members::table
        .filter(members::site_id.eq(site_id))
        .filter(members::car_number.eq(car_number))
        .select(MemberRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row.map(Member::from))
}

/// Lists the members of a site by name, paged.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_members(
    conn: &mut SqliteConnection,
    site_id: i64,
    page: PageRequest,
) -> Result<Page<Member>, PersistenceError> {
    let total: i64 = members::table
        .filter(members::site_id.eq(site_id))
        .count()
        .get_result(conn)?;
    let rows: Vec<MemberRow> = members::table
        .filter(members::site_id.eq(site_id))
        .select(MemberRow::as_select())
        .order((members::name.asc(), members::member_id.asc()))
        .limit(page.limit())
        .offset(page.offset())
        .load(conn)?;
    Ok(Page::new(
        rows.into_iter().map(Member::from).collect(),
        stored_count(total)?,
        page,
    ))
}

/// Retrieves a payment record by ID.
///
/// # Errors
///
/// Returns an error if the database query fails or the row is corrupt.
pub fn get_payment(
    conn: &mut SqliteConnection,
    history_id: i64,
) -> Result<Option<PaymentHistory>, PersistenceError> {
    let row: Option<PaymentRow> = member_payment_histories::table
        .filter(member_payment_histories::history_id.eq(history_id))
        .select(PaymentRow::as_select())
        .first(conn)
        .optional()?;
    row.map(PaymentHistory::try_from).transpose()
}

/// Lists a member's payment records by period start.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_payments(
    conn: &mut SqliteConnection,
    member_id: i64,
) -> Result<Vec<PaymentHistory>, PersistenceError> {
    let rows: Vec<PaymentRow> = member_payment_histories::table
        .filter(member_payment_histories::member_id.eq(member_id))
        .select(PaymentRow::as_select())
        .order((
            member_payment_histories::start_date.asc(),
            member_payment_histories::history_id.asc(),
        ))
        .load(conn)?;
    rows.into_iter().map(PaymentHistory::try_from).collect()
}

/// Lists a member's successful payments overlapping `[start, end]`.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_overlapping_payments(
    conn: &mut SqliteConnection,
    member_id: i64,
    start: &str,
    end: &str,
) -> Result<Vec<PaymentHistory>, PersistenceError> {
    let rows: Vec<PaymentRow> = member_payment_histories::table
        .filter(member_payment_histories::member_id.eq(member_id))
        .filter(member_payment_histories::status.eq(PaymentStatus::Success.as_str()))
        .filter(member_payment_histories::start_date.le(end))
        .filter(member_payment_histories::end_date.ge(start))
        .select(PaymentRow::as_select())
        .order(member_payment_histories::start_date.asc())
        .load(conn)?;
    rows.into_iter().map(PaymentHistory::try_from).collect()
}

/// Selects the effective membership record of a member for `today`.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn effective_membership(
    conn: &mut SqliteConnection,
    member_id: i64,
    today: Date,
) -> Result<Option<EffectiveMembership>, PersistenceError> {
    let records: Vec<PaymentHistory> = list_payments(conn, member_id)?;
    let effective: Option<EffectiveMembership> = find_effective_history(&records, today);
    debug!(
        member_id,
        candidates = records.len(),
        state = effective.as_ref().map(|e| e.state.as_str()),
        "Resolved effective membership"
    );
    Ok(effective)
}
