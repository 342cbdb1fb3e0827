// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Policy mutations.
//!
//! The blacklist selection flag is kept only in the `is_selected` column and
//! stripped from the stored configuration document, so a site can never
//! disagree with itself about which blacklist is selected.

use diesel::SqliteConnection;
use diesel::prelude::*;
use parkops::{apply_blacklist_selection, apply_policy_reset};
use parkops_audit::{Actor, AuditEvent, Cause};
use parkops_domain::{DomainError, NewPolicy, Policy, PolicyConfig, PolicyType, PolicyUpdate};
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::data_models::{BlacklistSelection, PolicyReset};
use crate::diesel_schema::policies;
use crate::error::PersistenceError;
use crate::mutations::audit::persist_audit_event;
use crate::mutations::now_timestamp;
use crate::queries::policy::{
    count_site_policies, get_policy, get_selected_blacklist, list_site_policies,
};
use crate::queries::topology::get_site;

fn stored_config(config: &PolicyConfig) -> Result<String, PersistenceError> {
    let mut value: Value = config.to_value()?;
    if let Value::Object(map) = &mut value {
        map.remove("is_selected");
    }
    Ok(value.to_string())
}

fn clear_selected_blacklist(
    conn: &mut SqliteConnection,
    site_id: i64,
) -> Result<usize, PersistenceError> {
    Ok(diesel::update(
        policies::table
            .filter(policies::site_id.eq(site_id))
            .filter(policies::policy_type.eq(PolicyType::Blacklist.as_str())),
    )
    .set(policies::is_selected.eq(0))
    .execute(conn)?)
}

fn insert_policy(
    conn: &mut SqliteConnection,
    policy: &NewPolicy,
    now: &str,
) -> Result<i64, PersistenceError> {
    diesel::insert_into(policies::table)
        .values((
            policies::site_id.eq(policy.site_id),
            policies::policy_type.eq(policy.policy_type().as_str()),
            policies::name.eq(&policy.name),
            policies::code.eq(policy.code.as_deref()),
            policies::config.eq(stored_config(&policy.config)?),
            policies::is_system.eq(i32::from(policy.is_system)),
            policies::is_selected.eq(i32::from(policy.config.is_selected())),
            policies::created_at.eq(now),
            policies::updated_at.eq(now),
        ))
        .execute(conn)
        .map_err(PersistenceError::on_unique("policy", &policy.name))
        .map_err(PersistenceError::on_foreign_key("site", policy.site_id))?;
    conn.get_last_insert_rowid()
}

fn reload(conn: &mut SqliteConnection, policy_id: i64) -> Result<Policy, PersistenceError> {
    get_policy(conn, policy_id)?.ok_or(PersistenceError::NotFound {
        entity: "policy",
        id: policy_id,
    })
}

/// Creates a policy.
///
/// A blacklist created as selected deselects the site's other blacklists in
/// the same transaction.
///
/// # Errors
///
/// Returns `PersistenceError::ParentNotFound` if the site does not exist, or
/// `PersistenceError::NameConflict` if the site already has a policy of that
/// name.
pub fn create_policy(
    conn: &mut SqliteConnection,
    policy: &NewPolicy,
) -> Result<Policy, PersistenceError> {
    conn.immediate_transaction(|conn| {
        if policy.config.is_selected() {
            let cleared: usize = clear_selected_blacklist(conn, policy.site_id)?;
            debug!(site_id = policy.site_id, cleared, "Cleared blacklist selection");
        }

        let policy_id: i64 = insert_policy(conn, policy, &now_timestamp()?)?;
        info!(
            site_id = policy.site_id,
            policy_id,
            policy_type = policy.policy_type().as_str(),
            name = %policy.name,
            "Created policy"
        );
        reload(conn, policy_id)
    })
}

/// Applies a partial update to a policy.
///
/// Kind, site, system flag and blacklist selection are not updatable here.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the policy does not exist,
/// `PersistenceError::Rejected` if the update is invalid, or
/// `PersistenceError::NameConflict` if the new name is taken.
pub fn update_policy(
    conn: &mut SqliteConnection,
    policy_id: i64,
    update: &PolicyUpdate,
) -> Result<Policy, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let current: Policy = reload(conn, policy_id)?;
        let next: Policy = current.apply_update(update)?;

        diesel::update(policies::table.filter(policies::policy_id.eq(policy_id)))
            .set((
                policies::name.eq(&next.name),
                policies::code.eq(next.code.as_deref()),
                policies::config.eq(stored_config(&next.config)?),
                policies::updated_at.eq(now_timestamp()?),
            ))
            .execute(conn)
            .map_err(PersistenceError::on_unique("policy", &next.name))?;

        debug!(policy_id, name = %next.name, "Updated policy");
        reload(conn, policy_id)
    })
}

/// Deletes a policy.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the policy does not exist, or
/// `PersistenceError::Rejected` if it is a system policy.
pub fn delete_policy(conn: &mut SqliteConnection, policy_id: i64) -> Result<(), PersistenceError> {
    conn.immediate_transaction(|conn| {
        let policy: Policy = reload(conn, policy_id)?;
        if policy.is_system {
            return Err(DomainError::SystemPolicyProtected { policy_id }.into());
        }

        diesel::delete(policies::table.filter(policies::policy_id.eq(policy_id)))
            .execute(conn)?;
        info!(policy_id, site_id = policy.site_id, "Deleted policy");
        Ok(())
    })
}

/// Replaces every policy of a site with `replacements`.
///
/// Runs as one transaction: if any replacement fails to insert, the site
/// keeps its previous policies.
///
/// # Errors
///
/// Returns `PersistenceError::ParentNotFound` if the site does not exist, or
/// `PersistenceError::Rejected` if the replacement set is invalid.
pub fn reset_policies(
    conn: &mut SqliteConnection,
    site_id: i64,
    replacements: &[NewPolicy],
    actor: Actor,
    cause: Cause,
) -> Result<PolicyReset, PersistenceError> {
    conn.immediate_transaction(|conn| {
        if get_site(conn, site_id)?.is_none() {
            return Err(PersistenceError::ParentNotFound {
                entity: "site",
                id: site_id,
            });
        }

        let previous: u64 = count_site_policies(conn, site_id)?;
        let removed: usize = usize::try_from(previous)
            .map_err(|e| PersistenceError::QueryFailed(e.to_string()))?;
        let event: AuditEvent = apply_policy_reset(site_id, removed, replacements, actor, cause)?;

        diesel::delete(policies::table.filter(policies::site_id.eq(site_id))).execute(conn)?;
        let now: String = now_timestamp()?;
        for policy in replacements {
            insert_policy(conn, policy, &now)?;
        }

        let event_id: i64 = persist_audit_event(conn, &event)?;
        info!(
            site_id,
            removed,
            inserted = replacements.len(),
            "Reset site policies"
        );
        Ok(PolicyReset {
            policies: list_site_policies(conn, site_id)?,
            removed,
            event_id,
        })
    })
}

/// Makes `policy_id` the selected blacklist of `site_id`.
///
/// Every other blacklist of the site is deselected in the same transaction.
/// Selecting the already-selected blacklist is allowed and audited.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the policy does not exist, or
/// `PersistenceError::Rejected` if it is not a blacklist of `site_id`.
pub fn select_blacklist_policy(
    conn: &mut SqliteConnection,
    site_id: i64,
    policy_id: i64,
    actor: Actor,
    cause: Cause,
) -> Result<BlacklistSelection, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let target: Policy = reload(conn, policy_id)?;
        let previous: Option<Policy> = get_selected_blacklist(conn, site_id)?;
        let event: AuditEvent =
            apply_blacklist_selection(site_id, previous.as_ref(), &target, actor, cause)?;

        clear_selected_blacklist(conn, site_id)?;
        diesel::update(policies::table.filter(policies::policy_id.eq(policy_id)))
            .set((
                policies::is_selected.eq(1),
                policies::updated_at.eq(now_timestamp()?),
            ))
            .execute(conn)?;

        let event_id: i64 = persist_audit_event(conn, &event)?;
        let previous_policy_id: Option<i64> = previous.map(|p| p.policy_id);
        info!(
            site_id,
            policy_id,
            previous = ?previous_policy_id,
            "Selected blacklist policy"
        );
        Ok(BlacklistSelection {
            policy: reload(conn, policy_id)?,
            previous_policy_id,
            event_id,
        })
    })
}
