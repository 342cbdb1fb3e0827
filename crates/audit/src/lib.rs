// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Audit trail records for parking sites.
//!
//! Every committed session transition, controller claim, blacklist selection
//! and policy reset produces exactly one [`AuditEvent`], written in the same
//! transaction as the change it describes. Events are filed under the site
//! they affect so a site's trail can be listed on its own.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]

/// Who asked for a change at a site: an operator, a plate detector or the
/// server itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Operator id or detector pipeline name, from `x-actor-id`.
    pub id: String,
    /// `operator` unless the request names another kind.
    pub actor_type: String,
}

impl Actor {
    /// An actor with the given id and kind.
    #[must_use]
    pub const fn new(id: String, actor_type: String) -> Self {
        Self { id, actor_type }
    }
}

/// The HTTP request or lane detection behind a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cause {
    /// Request id, from `x-request-id`.
    pub id: String,
    /// Method and path of the request, e.g. `POST /sites/1/sessions`.
    pub description: String,
}

impl Cause {
    /// A cause with the given request id and description.
    #[must_use]
    pub const fn new(id: String, description: String) -> Self {
        Self { id, description }
    }
}

/// The named operation that changed site state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Action name, e.g. "`OpenSession`", "`ClaimDeviceController`".
    pub name: String,
    /// Free-text summary, e.g. which site a controller was taken from.
    pub details: Option<String>,
}

impl Action {
    /// An action with an optional summary.
    #[must_use]
    pub const fn new(name: String, details: Option<String>) -> Self {
        Self { name, details }
    }
}

/// The touched record's fields, before or after the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    /// `key=value` pairs separated by `,`.
    pub data: String,
}

impl StateSnapshot {
    /// Wraps an already rendered snapshot, as read back from storage.
    #[must_use]
    pub const fn new(data: String) -> Self {
        Self { data }
    }

    /// Renders fields such as `status` or `paid_fee` in the given order.
    #[must_use]
    pub fn from_pairs(pairs: &[(&str, String)]) -> Self {
        let data: String = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<String>>()
            .join(",");
        Self { data }
    }
}

/// One committed change at a site, as stored in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Site whose trail lists the event. The trail keeps it after the site
    /// is deleted.
    pub site_id: Option<i64>,
    /// Requesting operator or detector.
    pub actor: Actor,
    /// Originating request.
    pub cause: Cause,
    /// Operation name and summary.
    pub action: Action,
    /// Record fields before the change.
    pub before: StateSnapshot,
    /// Record fields after the change.
    pub after: StateSnapshot,
}

impl AuditEvent {
    /// Assembles an event for `site_id`.
    #[must_use]
    pub const fn new(
        site_id: Option<i64>,
        actor: Actor,
        cause: Cause,
        action: Action,
        before: StateSnapshot,
        after: StateSnapshot,
    ) -> Self {
        Self {
            site_id,
            actor,
            cause,
            action,
            before,
            after,
        }
    }
}

#[cfg(test)]
mod tests;
