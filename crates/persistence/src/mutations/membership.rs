// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Member and payment history mutations.

use diesel::SqliteConnection;
use diesel::prelude::*;
use parkops_domain::{
    Member, PaymentHistory, PaymentStatus, Policy, PolicyType, find_overlapping_history,
    format_date, format_timestamp, validate_amount, validate_period,
};
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::diesel_schema::{member_payment_histories, members};
use crate::error::PersistenceError;
use crate::mutations::now_timestamp;
use crate::queries::membership::{get_member, get_payment, list_overlapping_payments};
use crate::queries::policy::get_policy;

fn reload_member(conn: &mut SqliteConnection, member_id: i64) -> Result<Member, PersistenceError> {
    get_member(conn, member_id)?.ok_or(PersistenceError::NotFound {
        entity: "member",
        id: member_id,
    })
}

fn reload_payment(
    conn: &mut SqliteConnection,
    history_id: i64,
) -> Result<PaymentHistory, PersistenceError> {
    get_payment(conn, history_id)?.ok_or(PersistenceError::NotFound {
        entity: "payment",
        id: history_id,
    })
}

/// Creates a member of a site.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `site_id` - The owning site
/// * `name` - Validated member name
/// * `car_number` - Normalized plate, unique within the site
/// * `phone` - Optional contact number
///
/// # Errors
///
/// Returns `PersistenceError::ParentNotFound` if the site does not exist, or
/// `PersistenceError::NameConflict` if the plate is already registered.
pub fn create_member(
    conn: &mut SqliteConnection,
    site_id: i64,
    name: &str,
    car_number: &str,
    phone: Option<&str>,
) -> Result<Member, PersistenceError> {
    diesel::insert_into(members::table)
        .values((
            members::site_id.eq(site_id),
            members::name.eq(name),
            members::car_number.eq(car_number),
            members::phone.eq(phone),
            members::created_at.eq(now_timestamp()?),
        ))
        .execute(conn)
        .map_err(PersistenceError::on_unique("member", car_number))
        .map_err(PersistenceError::on_foreign_key("site", site_id))?;

    let member_id: i64 = conn.get_last_insert_rowid()?;
    info!(site_id, member_id, car_number, "Created member");
    reload_member(conn, member_id)
}

/// Replaces a member's name, plate and phone.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the member does not exist, or
/// `PersistenceError::NameConflict` if the plate belongs to another member.
pub fn update_member(
    conn: &mut SqliteConnection,
    member_id: i64,
    name: &str,
    car_number: &str,
    phone: Option<&str>,
) -> Result<Member, PersistenceError> {
    let affected: usize = diesel::update(members::table.filter(members::member_id.eq(member_id)))
        .set((
            members::name.eq(name),
            members::car_number.eq(car_number),
            members::phone.eq(phone),
        ))
        .execute(conn)
        .map_err(PersistenceError::on_unique("member", car_number))?;
    if affected == 0 {
        return Err(PersistenceError::NotFound {
            entity: "member",
            id: member_id,
        });
    }
    debug!(member_id, car_number, "Updated member");
    reload_member(conn, member_id)
}

/// Deletes a member together with its payment history.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the member does not exist.
pub fn delete_member(conn: &mut SqliteConnection, member_id: i64) -> Result<(), PersistenceError> {
    let affected: usize =
        diesel::delete(members::table.filter(members::member_id.eq(member_id))).execute(conn)?;
    if affected == 0 {
        return Err(PersistenceError::NotFound {
            entity: "member",
            id: member_id,
        });
    }
    info!(member_id, "Deleted member");
    Ok(())
}

/// Records a successful membership payment for `[start, end]`.
///
/// The policy must be a membership policy of the member's site. Overlap with
/// an existing successful payment is checked first so the conflicting record
/// can be reported; the storage triggers reject any overlap that slips past.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `member_id` - The paying member
/// * `policy_id` - The membership policy paid for
/// * `amount` - Amount paid, in minor units
/// * `start` - First covered day
/// * `end` - Last covered day, inclusive
/// * `paid_at` - When the payment was made
///
/// # Errors
///
/// Returns `PersistenceError::ParentNotFound` for a missing member or an
/// unusable policy, `PersistenceError::Rejected` for an invalid amount or
/// period, or `PersistenceError::PeriodConflict` with the overlapping record.
pub fn create_payment(
    conn: &mut SqliteConnection,
    member_id: i64,
    policy_id: i64,
    amount: i64,
    start: Date,
    end: Date,
    paid_at: OffsetDateTime,
) -> Result<PaymentHistory, PersistenceError> {
    validate_amount("amount", amount)?;
    validate_period(start, end)?;
    let start_text: String = format_date(start);
    let end_text: String = format_date(end);

    conn.immediate_transaction(|conn| {
        let member: Member = get_member(conn, member_id)?.ok_or(PersistenceError::ParentNotFound {
            entity: "member",
            id: member_id,
        })?;
        let policy: Option<Policy> = get_policy(conn, policy_id)?;
        let usable: bool = policy.is_some_and(|p| {
            p.site_id == member.site_id && p.policy_type() == PolicyType::Membership
        });
        if !usable {
            return Err(PersistenceError::ParentNotFound {
                entity: "policy",
                id: policy_id,
            });
        }

        let overlapping: Vec<PaymentHistory> =
            list_overlapping_payments(conn, member_id, &start_text, &end_text)?;
        if let Some(existing) = find_overlapping_history(&overlapping, start, end) {
            return Err(PersistenceError::PeriodConflict(Box::new(existing.clone())));
        }

        diesel::insert_into(member_payment_histories::table)
            .values((
                member_payment_histories::member_id.eq(member_id),
                member_payment_histories::policy_id.eq(policy_id),
                member_payment_histories::amount.eq(amount),
                member_payment_histories::status.eq(PaymentStatus::Success.as_str()),
                member_payment_histories::start_date.eq(&start_text),
                member_payment_histories::end_date.eq(&end_text),
                member_payment_histories::paid_at.eq(format_timestamp(paid_at)?),
            ))
            .execute(conn)?;

        let history_id: i64 = conn.get_last_insert_rowid()?;
        info!(
            member_id,
            history_id,
            policy_id,
            amount,
            start = %start_text,
            end = %end_text,
            "Recorded membership payment"
        );
        reload_payment(conn, history_id)
    })
}

/// Marks a payment as canceled. Canceled payments no longer count for
/// overlap or effective membership.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the payment does not exist.
pub fn cancel_payment(
    conn: &mut SqliteConnection,
    history_id: i64,
) -> Result<PaymentHistory, PersistenceError> {
    let affected: usize = diesel::update(
        member_payment_histories::table.filter(member_payment_histories::history_id.eq(history_id)),
    )
    .set(member_payment_histories::status.eq(PaymentStatus::Canceled.as_str()))
    .execute(conn)?;
    if affected == 0 {
        return Err(PersistenceError::NotFound {
            entity: "payment",
            id: history_id,
        });
    }
    info!(history_id, "Canceled membership payment");
    reload_payment(conn, history_id)
}
