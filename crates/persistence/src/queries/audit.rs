// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Audit trail queries.

use diesel::SqliteConnection;
use diesel::prelude::*;
use parkops_audit::{Action, Actor, AuditEvent, Cause, StateSnapshot};
use parkops_domain::{Page, PageRequest};

use crate::data_models::AuditEventRecord;
use crate::diesel_schema::audit_events;
use crate::error::PersistenceError;
use crate::queries::{stored_count, stored_timestamp};

/// Diesel Queryable struct for audit event rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = audit_events)]
struct AuditEventRow {
    event_id: i64,
    site_id: Option<i64>,
    actor_id: String,
    actor_type: String,
    cause_id: String,
    cause_description: String,
    action_name: String,
    action_details: Option<String>,
    before_snapshot: String,
    after_snapshot: String,
    created_at: String,
}

impl TryFrom<AuditEventRow> for AuditEventRecord {
    type Error = PersistenceError;

    fn try_from(row: AuditEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            event_id: row.event_id,
            created_at: stored_timestamp(&row.created_at)?,
            event: AuditEvent::new(
                row.site_id,
                Actor::new(row.actor_id, row.actor_type),
                Cause::new(row.cause_id, row.cause_description),
                Action::new(row.action_name, row.action_details),
                StateSnapshot::new(row.before_snapshot),
                StateSnapshot::new(row.after_snapshot),
            ),
        })
    }
}

/// Retrieves an audit event by ID.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the event does not exist.
pub fn get_audit_event(
    conn: &mut SqliteConnection,
    event_id: i64,
) -> Result<AuditEventRecord, PersistenceError> {
    let row: AuditEventRow = audit_events::table
        .filter(audit_events::event_id.eq(event_id))
        .select(AuditEventRow::as_select())
        .first(conn)
        .map_err(PersistenceError::on_missing("audit event", event_id))?;
    AuditEventRecord::try_from(row)
}

/// Lists the audit events of a site, newest first, paged.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_audit_events(
    conn: &mut SqliteConnection,
    site_id: i64,
    page: PageRequest,
) -> Result<Page<AuditEventRecord>, PersistenceError> {
    let total: i64 = audit_events::table
        .filter(audit_events::site_id.eq(site_id))
        .count()
        .get_result(conn)?;
    let rows: Vec<AuditEventRow> = audit_events::table
        .filter(audit_events::site_id.eq(site_id))
        .select(AuditEventRow::as_select())
        .order(audit_events::event_id.desc())
        .limit(page.limit())
        .offset(page.offset())
        .load(conn)?;
    let items: Vec<AuditEventRecord> = rows
        .into_iter()
        .map(AuditEventRecord::try_from)
        .collect::<Result<_, _>>()?;
    Ok(Page::new(items, stored_count(total)?, page))
}
