// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Policy queries.
//!
//! The selection flag of a blacklist lives in the `is_selected` column only;
//! stored `config` documents never carry it and it is restored on read.

use diesel::SqliteConnection;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use parkops_domain::{
    Page, PageRequest, Policy, PolicyConfig, PolicyFilter, PolicySort, PolicyType, SortDirection,
};
use serde_json::Value;
use tracing::debug;

use crate::diesel_schema::policies;
use crate::error::PersistenceError;
use crate::queries::{like_pattern, stored_count, stored_flag, stored_timestamp};

/// Diesel Queryable struct for policy rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = policies)]
pub(crate) struct PolicyRow {
    policy_id: i64,
    site_id: i64,
    policy_type: String,
    name: String,
    code: Option<String>,
    config: String,
    is_system: i32,
    is_selected: i32,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PolicyRow> for Policy {
    type Error = PersistenceError;

    fn try_from(row: PolicyRow) -> Result<Self, Self::Error> {
        let policy_type: PolicyType = row
            .policy_type
            .parse()
            .map_err(|e| PersistenceError::corrupt(&e))?;
        let document: Value = serde_json::from_str(&row.config)?;
        let mut config: PolicyConfig = PolicyConfig::from_value(policy_type, document)
            .map_err(|e| PersistenceError::corrupt(&e))?;
        config.set_selected(stored_flag(row.is_selected));

        Ok(Self {
            policy_id: row.policy_id,
            site_id: row.site_id,
            name: row.name,
            code: row.code,
            config,
            is_system: stored_flag(row.is_system),
            created_at: stored_timestamp(&row.created_at)?,
            updated_at: stored_timestamp(&row.updated_at)?,
        })
    }
}

fn filtered<'a>(filter: &PolicyFilter) -> policies::BoxedQuery<'a, Sqlite> {
    let mut query = policies::table.into_boxed();
    if let Some(site_id) = filter.site_id {
        query = query.filter(policies::site_id.eq(site_id));
    }
    if let Some(policy_type) = filter.policy_type {
        query = query.filter(policies::policy_type.eq(policy_type.as_str()));
    }
    if let Some(fragment) = filter
        .name_contains
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
    {
        query = query.filter(policies::name.like(like_pattern(fragment)).escape('\\'));
    }
    if let Some(is_system) = filter.is_system {
        query = query.filter(policies::is_system.eq(i32::from(is_system)));
    }
    query
}

/// Retrieves a policy by ID.
///
/// # Errors
///
/// Returns an error if the database query fails or the row is corrupt.
/// Returns `Ok(None)` if the policy is not found.
pub fn get_policy(
    conn: &mut SqliteConnection,
    policy_id: i64,
) -> Result<Option<Policy>, PersistenceError> {
    debug!(policy_id, "Looking up policy");
    let row: Option<PolicyRow> = policies::table
        .filter(policies::policy_id.eq(policy_id))
        .select(PolicyRow::as_select())
        .first(conn)
        .optional()?;
    row.map(Policy::try_from).transpose()
}

/// Lists policies matching `filter`, sorted and paged.
///
/// Name and creation-time sorts fall back to the identifier so pages are
/// stable.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_policies(
    conn: &mut SqliteConnection,
    filter: &PolicyFilter,
    sort: PolicySort,
    direction: SortDirection,
    page: PageRequest,
) -> Result<Page<Policy>, PersistenceError> {
    let total: i64 = filtered(filter).count().get_result(conn)?;

    let query = filtered(filter).select(PolicyRow::as_select());
    let query = match (sort, direction) {
        (PolicySort::Id, SortDirection::Asc) => query.order(policies::policy_id.asc()),
        (PolicySort::Id, SortDirection::Desc) => query.order(policies::policy_id.desc()),
        (PolicySort::Name, SortDirection::Asc) => {
            query.order((policies::name.asc(), policies::policy_id.asc()))
        }
        (PolicySort::Name, SortDirection::Desc) => {
            query.order((policies::name.desc(), policies::policy_id.desc()))
        }
        (PolicySort::CreatedAt, SortDirection::Asc) => {
            query.order((policies::created_at.asc(), policies::policy_id.asc()))
        }
        (PolicySort::CreatedAt, SortDirection::Desc) => {
            query.order((policies::created_at.desc(), policies::policy_id.desc()))
        }
    };

    let rows: Vec<PolicyRow> = query
        .limit(page.limit())
        .offset(page.offset())
        .load(conn)?;
    let items: Vec<Policy> = rows
        .into_iter()
        .map(Policy::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Page::new(items, stored_count(total)?, page))
}

/// Lists every policy of a site in identifier order.
///
/// # Errors
///
/// Returns an error if the database query fails or a row is corrupt.
pub fn list_site_policies(
    conn: &mut SqliteConnection,
    site_id: i64,
) -> Result<Vec<Policy>, PersistenceError> {
    let rows: Vec<PolicyRow> = policies::table
        .filter(policies::site_id.eq(site_id))
        .select(PolicyRow::as_select())
        .order(policies::policy_id.asc())
        .load(conn)?;
    rows.into_iter().map(Policy::try_from).collect()
}

/// Counts the policies of a site.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_site_policies(
    conn: &mut SqliteConnection,
    site_id: i64,
) -> Result<u64, PersistenceError> {
    let count: i64 = policies::table
        .filter(policies::site_id.eq(site_id))
        .count()
        .get_result(conn)?;
    stored_count(count)
}

/// Retrieves the selected blacklist of a site.
///
/// # Errors
///
/// Returns an error if the database query fails or the row is corrupt.
pub fn get_selected_blacklist(
    conn: &mut SqliteConnection,
    site_id: i64,
) -> Result<Option<Policy>, PersistenceError> {
    let row: Option<PolicyRow> = policies::table
        .filter(policies::site_id.eq(site_id))
        .filter(policies::policy_type.eq(PolicyType::Blacklist.as_str()))
        .filter(policies::is_selected.eq(1))
        .select(PolicyRow::as_select())
        .first(conn)
        .optional()?;
    row.map(Policy::try_from).transpose()
}
