// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence layer for the parking operations core.
//!
//! This crate stores the site topology, policies, holidays, members and
//! their payments, parking sessions and the audit trail in `SQLite` through
//! Diesel.
//!
//! ## Storage Authority
//!
//! The application checks invariants before writing so callers get precise
//! errors, but the schema is the final authority:
//!
//! - `(parent, name)` uniqueness through unique constraints
//! - One selected blacklist per site through a partial unique index
//! - One active session per `(site, plate)` through a partial unique index
//! - Holiday collisions and overlapping successful payments through triggers
//!
//! Constraint failures are translated into `PersistenceError` variants of the
//! same taxonomy the pre-flight checks use.
//!
//! ## Transactions
//!
//! Multi-step writes (blacklist selection, policy reset, device assignment,
//! controller toggles, session commands) run inside one immediate
//! transaction together with their audit event. Any error rolls the whole
//! unit back.
//!
//! ## Testing Philosophy
//!
//! - Tests run against isolated shared in-memory databases
//! - Each `new_in_memory()` call gets its own database
//! - Migrations and foreign key enforcement are exercised on every test

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

use diesel::SqliteConnection;
use parkops::Command;
use parkops_audit::{Actor, Cause};
use parkops_domain::{
    Device, DeviceController, DeviceKind, EffectiveMembership, Holiday, Lane, LaneDirection,
    Member, NewPolicy, Page, PageRequest, ParkingSession, PaymentHistory, Policy, PolicyFilter,
    PolicySort, PolicyUpdate, SessionFilter, Site, SiteStatistics, SiteTree, SortDirection, Zone,
};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use time::{Date, OffsetDateTime};

/// Atomic counter for generating unique in-memory database names.
///
/// This ensures deterministic test isolation by eliminating time-based collisions.
/// Each call to `new_in_memory()` receives a unique sequential ID.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

mod backend;
mod data_models;
mod diesel_schema;
mod error;
mod mutations;
mod queries;

#[cfg(test)]
mod tests;

pub use data_models::{
    AuditEventRecord, BlacklistSelection, ControllerToggleOutcome, PolicyReset, SessionTransition,
};
pub use error::PersistenceError;

use backend::PersistenceBackend;

/// Persistence adapter for the parking operations core.
///
/// Owns a single `SQLite` connection. Callers that share it across tasks
/// serialize access themselves.
pub struct Persistence {
    pub(crate) conn: SqliteConnection,
}

impl Persistence {
    /// Creates a new persistence adapter with an in-memory `SQLite` database.
    ///
    /// Uses a shared in-memory database via `Diesel`.
    ///
    /// Each call receives a unique database instance via atomic counter,
    /// ensuring deterministic test isolation without time-based collisions.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        let db_id = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let db_name = format!("memdb_test_{db_id}");
        let shared_memory_url = format!("file:{db_name}?mode=memory&cache=shared");

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(&shared_memory_url)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    /// Creates a new persistence adapter with a file-based `SQLite` database.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the `SQLite` database file
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_str = path.as_ref().to_str().ok_or_else(|| {
            PersistenceError::InitializationError("Invalid database path".to_string())
        })?;

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(path_str)?;

        // WAL lets readers proceed while a write transaction is open
        backend::sqlite::enable_wal_mode(&mut conn)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    /// Bounds how long a statement waits for a database lock before failing.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout cannot be applied.
    pub fn set_busy_timeout(&mut self, timeout: Duration) -> Result<(), PersistenceError> {
        backend::sqlite::set_busy_timeout(&mut self.conn, timeout)
    }

    /// Verifies that foreign key enforcement is enabled.
    ///
    /// This is a startup-time check required to ensure
    /// referential integrity constraints are enforced.
    ///
    /// # Errors
    ///
    /// Returns an error if foreign key enforcement is not enabled.
    pub fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        self.conn.verify_foreign_key_enforcement()
    }

    // ========================================================================
    // Sites
    // ========================================================================

    /// Creates a site.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NameConflict` if the name is taken.
    pub fn create_site(
        &mut self,
        name: &str,
        timezone: &str,
        address: Option<&str>,
    ) -> Result<Site, PersistenceError> {
        mutations::topology::create_site(&mut self.conn, name, timezone, address)
    }

    /// Replaces a site's name, timezone and address.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` or `PersistenceError::NameConflict`.
    pub fn update_site(
        &mut self,
        site_id: i64,
        name: &str,
        timezone: &str,
        address: Option<&str>,
    ) -> Result<Site, PersistenceError> {
        mutations::topology::update_site(&mut self.conn, site_id, name, timezone, address)
    }

    /// Deletes a site and everything it owns.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the site does not exist.
    pub fn delete_site(&mut self, site_id: i64) -> Result<(), PersistenceError> {
        mutations::topology::delete_site(&mut self.conn, site_id)
    }

    /// Retrieves a site by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_site(&mut self, site_id: i64) -> Result<Option<Site>, PersistenceError> {
        queries::topology::get_site(&mut self.conn, site_id)
    }

    /// Lists all sites ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_sites(&mut self) -> Result<Vec<Site>, PersistenceError> {
        queries::topology::list_sites(&mut self.conn)
    }

    /// Loads the nested configuration graph of a site.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn find_site_tree(&mut self, site_id: i64) -> Result<Option<SiteTree>, PersistenceError> {
        queries::topology::find_site_tree(&mut self.conn, site_id)
    }

    // ========================================================================
    // Zones & Lanes
    // ========================================================================

    /// Creates a zone within a site.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::ParentNotFound` or `PersistenceError::NameConflict`.
    pub fn create_zone(&mut self, site_id: i64, name: &str) -> Result<Zone, PersistenceError> {
        mutations::topology::create_zone(&mut self.conn, site_id, name)
    }

    /// Renames a zone.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` or `PersistenceError::NameConflict`.
    pub fn update_zone(&mut self, zone_id: i64, name: &str) -> Result<Zone, PersistenceError> {
        mutations::topology::update_zone(&mut self.conn, zone_id, name)
    }

    /// Deletes a zone and its lanes.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the zone does not exist.
    pub fn delete_zone(&mut self, zone_id: i64) -> Result<(), PersistenceError> {
        mutations::topology::delete_zone(&mut self.conn, zone_id)
    }

    /// Retrieves a zone by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_zone(&mut self, zone_id: i64) -> Result<Option<Zone>, PersistenceError> {
        queries::topology::get_zone(&mut self.conn, zone_id)
    }

    /// Lists the zones of a site.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_zones(&mut self, site_id: i64) -> Result<Vec<Zone>, PersistenceError> {
        queries::topology::list_zones(&mut self.conn, site_id)
    }

    /// Creates a lane within a zone.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::ParentNotFound` or `PersistenceError::NameConflict`.
    pub fn create_lane(
        &mut self,
        zone_id: i64,
        name: &str,
        direction: LaneDirection,
    ) -> Result<Lane, PersistenceError> {
        mutations::topology::create_lane(&mut self.conn, zone_id, name, direction)
    }

    /// Replaces a lane's name and direction.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` or `PersistenceError::NameConflict`.
    pub fn update_lane(
        &mut self,
        lane_id: i64,
        name: &str,
        direction: LaneDirection,
    ) -> Result<Lane, PersistenceError> {
        mutations::topology::update_lane(&mut self.conn, lane_id, name, direction)
    }

    /// Deletes a lane, detaching its devices.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the lane does not exist.
    pub fn delete_lane(&mut self, lane_id: i64) -> Result<(), PersistenceError> {
        mutations::topology::delete_lane(&mut self.conn, lane_id)
    }

    /// Retrieves a lane by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_lane(&mut self, lane_id: i64) -> Result<Option<Lane>, PersistenceError> {
        queries::topology::get_lane(&mut self.conn, lane_id)
    }

    /// Returns the site owning a lane.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn lane_site_id(&mut self, lane_id: i64) -> Result<Option<i64>, PersistenceError> {
        queries::topology::lane_site_id(&mut self.conn, lane_id)
    }

    /// Lists the lanes of a zone.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_lanes(&mut self, zone_id: i64) -> Result<Vec<Lane>, PersistenceError> {
        queries::topology::list_lanes(&mut self.conn, zone_id)
    }

    // ========================================================================
    // Device Controllers & Devices
    // ========================================================================

    /// Creates a device controller.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::ParentNotFound` or `PersistenceError::NameConflict`.
    pub fn create_controller(
        &mut self,
        site_id: Option<i64>,
        name: &str,
        host: &str,
        port: u16,
    ) -> Result<DeviceController, PersistenceError> {
        mutations::topology::create_controller(&mut self.conn, site_id, name, host, port)
    }

    /// Replaces a controller's name and address.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` or `PersistenceError::NameConflict`.
    pub fn update_controller(
        &mut self,
        controller_id: i64,
        name: &str,
        host: &str,
        port: u16,
    ) -> Result<DeviceController, PersistenceError> {
        mutations::topology::update_controller(&mut self.conn, controller_id, name, host, port)
    }

    /// Deletes a controller, detaching its devices.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the controller does not exist.
    pub fn delete_controller(&mut self, controller_id: i64) -> Result<(), PersistenceError> {
        mutations::topology::delete_controller(&mut self.conn, controller_id)
    }

    /// Retrieves a controller by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_controller(
        &mut self,
        controller_id: i64,
    ) -> Result<Option<DeviceController>, PersistenceError> {
        queries::topology::get_controller(&mut self.conn, controller_id)
    }

    /// Lists controllers, optionally only unassigned ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_controllers(
        &mut self,
        unassigned_only: bool,
    ) -> Result<Vec<DeviceController>, PersistenceError> {
        queries::topology::list_controllers(&mut self.conn, unassigned_only)
    }

    /// Flips a controller's link to `site_id`, claiming it from any other site.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the site or controller does not exist.
    pub fn toggle_controller_site(
        &mut self,
        site_id: i64,
        controller_id: i64,
        actor: Actor,
        cause: Cause,
    ) -> Result<ControllerToggleOutcome, PersistenceError> {
        mutations::topology::toggle_controller_site(
            &mut self.conn,
            site_id,
            controller_id,
            actor,
            cause,
        )
    }

    /// Creates a device.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::ParentNotFound` or `PersistenceError::NameConflict`.
    pub fn create_device(
        &mut self,
        site_id: i64,
        lane_id: Option<i64>,
        controller_id: Option<i64>,
        name: &str,
        kind: DeviceKind,
    ) -> Result<Device, PersistenceError> {
        mutations::topology::create_device(
            &mut self.conn,
            site_id,
            lane_id,
            controller_id,
            name,
            kind,
        )
    }

    /// Replaces a device's lane, controller, name and kind.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound`, `PersistenceError::ParentNotFound`
    /// or `PersistenceError::NameConflict`.
    pub fn update_device(
        &mut self,
        device_id: i64,
        lane_id: Option<i64>,
        controller_id: Option<i64>,
        name: &str,
        kind: DeviceKind,
    ) -> Result<Device, PersistenceError> {
        mutations::topology::update_device(
            &mut self.conn,
            device_id,
            lane_id,
            controller_id,
            name,
            kind,
        )
    }

    /// Deletes a device.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the device does not exist.
    pub fn delete_device(&mut self, device_id: i64) -> Result<(), PersistenceError> {
        mutations::topology::delete_device(&mut self.conn, device_id)
    }

    /// Retrieves a device by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_device(&mut self, device_id: i64) -> Result<Option<Device>, PersistenceError> {
        queries::topology::get_device(&mut self.conn, device_id)
    }

    /// Lists the devices of a site.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_devices(&mut self, site_id: i64) -> Result<Vec<Device>, PersistenceError> {
        queries::topology::list_devices(&mut self.conn, site_id)
    }

    /// Lists the devices attached to a lane.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_lane_devices(&mut self, lane_id: i64) -> Result<Vec<Device>, PersistenceError> {
        queries::topology::list_lane_devices(&mut self.conn, lane_id)
    }

    /// Makes `device_ids` the exact device set of a lane.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::ParentNotFound` for a missing lane or
    /// `PersistenceError::NotFound` for a device that cannot be attached.
    pub fn assign_devices_to_lane(
        &mut self,
        lane_id: i64,
        device_ids: &[i64],
    ) -> Result<Vec<Device>, PersistenceError> {
        mutations::topology::assign_devices_to_lane(&mut self.conn, lane_id, device_ids)
    }

    // ========================================================================
    // Policies
    // ========================================================================

    /// Creates a policy.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::ParentNotFound` or `PersistenceError::NameConflict`.
    pub fn create_policy(&mut self, policy: &NewPolicy) -> Result<Policy, PersistenceError> {
        mutations::policy::create_policy(&mut self.conn, policy)
    }

    /// Applies a partial update to a policy.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound`, `PersistenceError::Rejected` or
    /// `PersistenceError::NameConflict`.
    pub fn update_policy(
        &mut self,
        policy_id: i64,
        update: &PolicyUpdate,
    ) -> Result<Policy, PersistenceError> {
        mutations::policy::update_policy(&mut self.conn, policy_id, update)
    }

    /// Deletes a non-system policy.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` or `PersistenceError::Rejected`.
    pub fn delete_policy(&mut self, policy_id: i64) -> Result<(), PersistenceError> {
        mutations::policy::delete_policy(&mut self.conn, policy_id)
    }

    /// Retrieves a policy by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_policy(&mut self, policy_id: i64) -> Result<Option<Policy>, PersistenceError> {
        queries::policy::get_policy(&mut self.conn, policy_id)
    }

    /// Lists policies matching `filter`, sorted and paged.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_policies(
        &mut self,
        filter: &PolicyFilter,
        sort: PolicySort,
        direction: SortDirection,
        page: PageRequest,
    ) -> Result<Page<Policy>, PersistenceError> {
        queries::policy::list_policies(&mut self.conn, filter, sort, direction, page)
    }

    /// Retrieves the selected blacklist of a site.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_selected_blacklist(
        &mut self,
        site_id: i64,
    ) -> Result<Option<Policy>, PersistenceError> {
        queries::policy::get_selected_blacklist(&mut self.conn, site_id)
    }

    /// Replaces every policy of a site.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::ParentNotFound` or `PersistenceError::Rejected`;
    /// the previous policies are kept on any error.
    pub fn reset_policies(
        &mut self,
        site_id: i64,
        replacements: &[NewPolicy],
        actor: Actor,
        cause: Cause,
    ) -> Result<PolicyReset, PersistenceError> {
        mutations::policy::reset_policies(&mut self.conn, site_id, replacements, actor, cause)
    }

    /// Makes `policy_id` the only selected blacklist of `site_id`.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` or `PersistenceError::Rejected`;
    /// the previous selection is kept on any error.
    pub fn select_blacklist_policy(
        &mut self,
        site_id: i64,
        policy_id: i64,
        actor: Actor,
        cause: Cause,
    ) -> Result<BlacklistSelection, PersistenceError> {
        mutations::policy::select_blacklist_policy(&mut self.conn, site_id, policy_id, actor, cause)
    }

    // ========================================================================
    // Holidays
    // ========================================================================

    /// Creates a holiday.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::HolidayConflict` with the colliding holiday,
    /// or `PersistenceError::ParentNotFound`.
    pub fn create_holiday(
        &mut self,
        site_id: i64,
        name: &str,
        date: Date,
        recurring: bool,
    ) -> Result<Holiday, PersistenceError> {
        mutations::calendar::create_holiday(&mut self.conn, site_id, name, date, recurring)
    }

    /// Replaces a holiday's name, date and recurrence.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` or `PersistenceError::HolidayConflict`.
    pub fn update_holiday(
        &mut self,
        holiday_id: i64,
        name: &str,
        date: Date,
        recurring: bool,
    ) -> Result<Holiday, PersistenceError> {
        mutations::calendar::update_holiday(&mut self.conn, holiday_id, name, date, recurring)
    }

    /// Deletes a holiday.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the holiday does not exist.
    pub fn delete_holiday(&mut self, holiday_id: i64) -> Result<(), PersistenceError> {
        mutations::calendar::delete_holiday(&mut self.conn, holiday_id)
    }

    /// Retrieves a holiday by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_holiday(&mut self, holiday_id: i64) -> Result<Option<Holiday>, PersistenceError> {
        queries::calendar::get_holiday(&mut self.conn, holiday_id)
    }

    /// Lists a site's holidays, optionally only those falling in `year`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_holidays(
        &mut self,
        site_id: i64,
        year: Option<i32>,
    ) -> Result<Vec<Holiday>, PersistenceError> {
        queries::calendar::list_holidays(&mut self.conn, site_id, year)
    }

    /// Whether `date` is a holiday at the site.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn is_holiday(&mut self, site_id: i64, date: Date) -> Result<bool, PersistenceError> {
        queries::calendar::is_site_holiday(&mut self.conn, site_id, date)
    }

    // ========================================================================
    // Members & Payments
    // ========================================================================

    /// Creates a member.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::ParentNotFound` or `PersistenceError::NameConflict`.
    pub fn create_member(
        &mut self,
        site_id: i64,
        name: &str,
        car_number: &str,
        phone: Option<&str>,
    ) -> Result<Member, PersistenceError> {
        mutations::membership::create_member(&mut self.conn, site_id, name, car_number, phone)
    }

    /// Replaces a member's name, plate and phone.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` or `PersistenceError::NameConflict`.
    pub fn update_member(
        &mut self,
        member_id: i64,
        name: &str,
        car_number: &str,
        phone: Option<&str>,
    ) -> Result<Member, PersistenceError> {
        mutations::membership::update_member(&mut self.conn, member_id, name, car_number, phone)
    }

    /// Deletes a member and its payments.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the member does not exist.
    pub fn delete_member(&mut self, member_id: i64) -> Result<(), PersistenceError> {
        mutations::membership::delete_member(&mut self.conn, member_id)
    }

    /// Retrieves a member by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_member(&mut self, member_id: i64) -> Result<Option<Member>, PersistenceError> {
        queries::membership::get_member(&mut self.conn, member_id)
    }

    /// Finds a member of a site by plate.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn find_member_by_car_number(
        &mut self,
        site_id: i64,
        car_number: &str,
    ) -> Result<Option<Member>, PersistenceError> {
        queries::membership::find_member_by_car_number(&mut self.conn, site_id, car_number)
    }

    /// Lists a site's members, paged.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_members(
        &mut self,
        site_id: i64,
        page: PageRequest,
    ) -> Result<Page<Member>, PersistenceError> {
        queries::membership::list_members(&mut self.conn, site_id, page)
    }

    /// Records a successful membership payment.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::PeriodConflict` with the overlapping record,
    /// `PersistenceError::ParentNotFound` or `PersistenceError::Rejected`.
    pub fn create_payment(
        &mut self,
        member_id: i64,
        policy_id: i64,
        amount: i64,
        start: Date,
        end: Date,
        paid_at: OffsetDateTime,
    ) -> Result<PaymentHistory, PersistenceError> {
        mutations::membership::create_payment(
            &mut self.conn,
            member_id,
            policy_id,
            amount,
            start,
            end,
            paid_at,
        )
    }

    /// Cancels a payment.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the payment does not exist.
    pub fn cancel_payment(&mut self, history_id: i64) -> Result<PaymentHistory, PersistenceError> {
        mutations::membership::cancel_payment(&mut self.conn, history_id)
    }

    /// Retrieves a payment by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_payment(
        &mut self,
        history_id: i64,
    ) -> Result<Option<PaymentHistory>, PersistenceError> {
        queries::membership::get_payment(&mut self.conn, history_id)
    }

    /// Lists a member's payments.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_payments(
        &mut self,
        member_id: i64,
    ) -> Result<Vec<PaymentHistory>, PersistenceError> {
        queries::membership::list_payments(&mut self.conn, member_id)
    }

    /// Selects a member's effective membership for `today`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn effective_membership(
        &mut self,
        member_id: i64,
        today: Date,
    ) -> Result<Option<EffectiveMembership>, PersistenceError> {
        queries::membership::effective_membership(&mut self.conn, member_id, today)
    }

    // ========================================================================
    // Parking Sessions
    // ========================================================================

    /// Applies a session command and persists it with its audit event.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::ParentNotFound`, `PersistenceError::NotFound`
    /// or `PersistenceError::Rejected`.
    pub fn apply_session_command(
        &mut self,
        command: Command,
        actor: Actor,
        cause: Cause,
    ) -> Result<SessionTransition, PersistenceError> {
        mutations::sessions::apply_session_command(&mut self.conn, command, actor, cause)
    }

    /// Retrieves a session by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_session(
        &mut self,
        session_id: i64,
    ) -> Result<Option<ParkingSession>, PersistenceError> {
        queries::sessions::get_session(&mut self.conn, session_id)
    }

    /// Finds the most recent active session of a plate at a site.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn find_active_session(
        &mut self,
        site_id: i64,
        car_number: &str,
    ) -> Result<Option<ParkingSession>, PersistenceError> {
        queries::sessions::find_active_session(&mut self.conn, site_id, car_number)
    }

    /// Lists a site's sessions, newest first, paged.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_sessions(
        &mut self,
        site_id: i64,
        filter: &SessionFilter,
        page: PageRequest,
    ) -> Result<Page<ParkingSession>, PersistenceError> {
        queries::sessions::list_sessions(&mut self.conn, site_id, filter, page)
    }

    // ========================================================================
    // Statistics & Audit
    // ========================================================================

    /// Computes a site's traffic and revenue figures since `day_start`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn get_statistics(
        &mut self,
        site_id: i64,
        day_start: OffsetDateTime,
    ) -> Result<SiteStatistics, PersistenceError> {
        queries::statistics::get_statistics(&mut self.conn, site_id, day_start)
    }

    /// Retrieves an audit event by ID.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the event does not exist.
    pub fn get_audit_event(&mut self, event_id: i64) -> Result<AuditEventRecord, PersistenceError> {
        queries::audit::get_audit_event(&mut self.conn, event_id)
    }

    /// Lists a site's audit events, newest first, paged.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn list_audit_events(
        &mut self,
        site_id: i64,
        page: PageRequest,
    ) -> Result<Page<AuditEventRecord>, PersistenceError> {
        queries::audit::list_audit_events(&mut self.conn, site_id, page)
    }
}
