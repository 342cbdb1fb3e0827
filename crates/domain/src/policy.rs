// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Site-scoped policy records and their typed configuration documents.
//!
//! Each policy kind has its own configuration schema. Updates arrive as a
//! patch document and are merged one level deep: every top-level key present
//! in the patch replaces the stored value, absent keys are kept. Keys that
//! the kind does not define are rejected rather than stored.

use crate::error::DomainError;
use crate::validation::{
    normalize_car_number, validate_amount, validate_name, validate_optional_text,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;
use time::OffsetDateTime;

/// Policy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
    /// Fee schedule.
    Fee,
    /// Discount rule.
    Reduction,
    /// Plate blacklist. At most one per site is selected.
    Blacklist,
    /// Membership product.
    Membership,
}

impl PolicyType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fee => "FEE",
            Self::Reduction => "REDUCTION",
            Self::Blacklist => "BLACKLIST",
            Self::Membership => "MEMBERSHIP",
        }
    }
}

impl FromStr for PolicyType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FEE" => Ok(Self::Fee),
            "REDUCTION" => Ok(Self::Reduction),
            "BLACKLIST" => Ok(Self::Blacklist),
            "MEMBERSHIP" => Ok(Self::Membership),
            _ => Err(DomainError::InvalidPolicyType(s.to_string())),
        }
    }
}

impl std::fmt::Display for PolicyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Distinguishes an absent key (None) from an explicit null (Some(None)).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Fee schedule parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeeConfig {
    /// Stays up to this many minutes are free.
    pub free_minutes: u32,
    /// Minutes covered by the base fee.
    pub base_minutes: u32,
    /// Fee for the base period.
    pub base_fee: i64,
    /// Length of each additional charging unit.
    pub unit_minutes: u32,
    /// Fee per additional unit.
    pub unit_fee: i64,
    /// Cap on the fee for one calendar day.
    pub daily_max_fee: Option<i64>,
    /// Minutes allowed between pre-settlement and exit.
    pub exit_grace_minutes: u32,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            free_minutes: 0,
            base_minutes: 30,
            base_fee: 0,
            unit_minutes: 10,
            unit_fee: 0,
            daily_max_fee: None,
            exit_grace_minutes: 15,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeeConfigPatch {
    free_minutes: Option<u32>,
    base_minutes: Option<u32>,
    base_fee: Option<i64>,
    unit_minutes: Option<u32>,
    unit_fee: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    daily_max_fee: Option<Option<i64>>,
    exit_grace_minutes: Option<u32>,
}

/// How a reduction lowers the fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReductionKind {
    /// Percentage off the total.
    #[default]
    Percent,
    /// Fixed amount off the total.
    Amount,
    /// Minutes removed from the charged duration.
    FreeMinutes,
}

/// Discount rule parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReductionConfig {
    /// Reduction kind.
    pub kind: ReductionKind,
    /// Percent, amount, or minutes depending on `kind`.
    pub value: i64,
    /// Whether the reduction also applies on holidays.
    pub applies_on_holiday: bool,
    /// Operator note shown on receipts.
    pub description: Option<String>,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            kind: ReductionKind::Percent,
            value: 0,
            applies_on_holiday: true,
            description: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReductionConfigPatch {
    kind: Option<ReductionKind>,
    value: Option<i64>,
    applies_on_holiday: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    description: Option<Option<String>>,
}

/// What happens when a blacklisted plate is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlacklistAction {
    /// Keep the barrier closed.
    #[default]
    DenyEntry,
    /// Let the vehicle in and raise an operator alert.
    AlertOnly,
}

/// Blacklist parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlacklistConfig {
    /// Whether this blacklist is the one in force for the site.
    pub is_selected: bool,
    /// Enforcement action.
    pub action: BlacklistAction,
    /// Normalized plates on the list.
    pub car_numbers: Vec<String>,
    /// Message shown on the lane display.
    pub message: Option<String>,
}

// No `is_selected`: selection changes only through blacklist selection.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BlacklistConfigPatch {
    action: Option<BlacklistAction>,
    car_numbers: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    message: Option<Option<String>>,
}

/// Membership product parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MembershipConfig {
    /// Length of one paid period.
    pub period_days: u32,
    /// Price of one period.
    pub fee: i64,
    /// Vehicles a member may register.
    pub max_vehicles: u32,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            period_days: 30,
            fee: 0,
            max_vehicles: 1,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MembershipConfigPatch {
    period_days: Option<u32>,
    fee: Option<i64>,
    max_vehicles: Option<u32>,
}

/// A typed policy configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyConfig {
    /// Fee schedule.
    Fee(FeeConfig),
    /// Discount rule.
    Reduction(ReductionConfig),
    /// Plate blacklist.
    Blacklist(BlacklistConfig),
    /// Membership product.
    Membership(MembershipConfig),
}

fn parse_document<T: DeserializeOwned>(
    policy_type: PolicyType,
    value: Value,
) -> Result<T, DomainError> {
    let value: Value = if value.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        value
    };
    serde_json::from_value(value).map_err(|e| DomainError::InvalidPolicyConfig {
        policy_type,
        reason: e.to_string(),
    })
}

impl PolicyConfig {
    /// Interprets a JSON document as the configuration of `policy_type`.
    ///
    /// Missing keys take their defaults; `null` is treated as `{}`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPolicyConfig` for unknown keys, wrongly
    /// typed values, or values that fail validation.
    pub fn from_value(policy_type: PolicyType, value: Value) -> Result<Self, DomainError> {
        let config: Self = match policy_type {
            PolicyType::Fee => Self::Fee(parse_document(policy_type, value)?),
            PolicyType::Reduction => Self::Reduction(parse_document(policy_type, value)?),
            PolicyType::Blacklist => Self::Blacklist(parse_document(policy_type, value)?),
            PolicyType::Membership => Self::Membership(parse_document(policy_type, value)?),
        };
        config.validated()
    }

    /// Renders the configuration as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPolicyConfig` if serialization fails.
    pub fn to_value(&self) -> Result<Value, DomainError> {
        let result = match self {
            Self::Fee(c) => serde_json::to_value(c),
            Self::Reduction(c) => serde_json::to_value(c),
            Self::Blacklist(c) => serde_json::to_value(c),
            Self::Membership(c) => serde_json::to_value(c),
        };
        result.map_err(|e| DomainError::InvalidPolicyConfig {
            policy_type: self.policy_type(),
            reason: e.to_string(),
        })
    }

    /// The kind this configuration belongs to.
    #[must_use]
    pub const fn policy_type(&self) -> PolicyType {
        match self {
            Self::Fee(_) => PolicyType::Fee,
            Self::Reduction(_) => PolicyType::Reduction,
            Self::Blacklist(_) => PolicyType::Blacklist,
            Self::Membership(_) => PolicyType::Membership,
        }
    }

    /// Whether this is a selected blacklist. Always false for other kinds.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        match self {
            Self::Blacklist(c) => c.is_selected,
            _ => false,
        }
    }

    /// Sets the blacklist selection flag. No effect on other kinds.
    pub const fn set_selected(&mut self, selected: bool) {
        if let Self::Blacklist(c) = self {
            c.is_selected = selected;
        }
    }

    /// Merges a patch document into this configuration.
    ///
    /// Top-level keys in `patch` replace the stored values; nested values
    /// are replaced whole.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPolicyConfig` if the patch is not an
    /// object, names a key the kind does not define, or produces an invalid
    /// configuration.
    pub fn merge(&self, patch: Value) -> Result<Self, DomainError> {
        let policy_type: PolicyType = self.policy_type();
        if !patch.is_object() {
            return Err(DomainError::InvalidPolicyConfig {
                policy_type,
                reason: String::from("config patch must be an object"),
            });
        }

        let merged: Self = match self {
            Self::Fee(current) => {
                let p: FeeConfigPatch = parse_document(policy_type, patch)?;
                let mut next: FeeConfig = current.clone();
                if let Some(v) = p.free_minutes {
                    next.free_minutes = v;
                }
                if let Some(v) = p.base_minutes {
                    next.base_minutes = v;
                }
                if let Some(v) = p.base_fee {
                    next.base_fee = v;
                }
                if let Some(v) = p.unit_minutes {
                    next.unit_minutes = v;
                }
                if let Some(v) = p.unit_fee {
                    next.unit_fee = v;
                }
                if let Some(v) = p.daily_max_fee {
                    next.daily_max_fee = v;
                }
                if let Some(v) = p.exit_grace_minutes {
                    next.exit_grace_minutes = v;
                }
                Self::Fee(next)
            }
            Self::Reduction(current) => {
                let p: ReductionConfigPatch = parse_document(policy_type, patch)?;
                let mut next: ReductionConfig = current.clone();
                if let Some(v) = p.kind {
                    next.kind = v;
                }
                if let Some(v) = p.value {
                    next.value = v;
                }
                if let Some(v) = p.applies_on_holiday {
                    next.applies_on_holiday = v;
                }
                if let Some(v) = p.description {
                    next.description = v;
                }
                Self::Reduction(next)
            }
            Self::Blacklist(current) => {
                let p: BlacklistConfigPatch = parse_document(policy_type, patch)?;
                let mut next: BlacklistConfig = current.clone();
                if let Some(v) = p.action {
                    next.action = v;
                }
                if let Some(v) = p.car_numbers {
                    next.car_numbers = v;
                }
                if let Some(v) = p.message {
                    next.message = v;
                }
                Self::Blacklist(next)
            }
            Self::Membership(current) => {
                let p: MembershipConfigPatch = parse_document(policy_type, patch)?;
                let mut next: MembershipConfig = current.clone();
                if let Some(v) = p.period_days {
                    next.period_days = v;
                }
                if let Some(v) = p.fee {
                    next.fee = v;
                }
                if let Some(v) = p.max_vehicles {
                    next.max_vehicles = v;
                }
                Self::Membership(next)
            }
        };
        merged.validated()
    }

    fn validated(self) -> Result<Self, DomainError> {
        let policy_type: PolicyType = self.policy_type();
        let invalid = |reason: String| DomainError::InvalidPolicyConfig {
            policy_type,
            reason,
        };

        match self {
            Self::Fee(c) => {
                validate_amount("base_fee", c.base_fee)?;
                validate_amount("unit_fee", c.unit_fee)?;
                if let Some(max) = c.daily_max_fee {
                    validate_amount("daily_max_fee", max)?;
                }
                if c.unit_minutes == 0 {
                    return Err(invalid(String::from("unit_minutes must be at least 1")));
                }
                Ok(Self::Fee(c))
            }
            Self::Reduction(mut c) => {
                validate_amount("value", c.value)?;
                if c.kind == ReductionKind::Percent && c.value > 100 {
                    return Err(invalid(format!(
                        "percent reduction must be at most 100, got {}",
                        c.value
                    )));
                }
                c.description = validate_optional_text("description", c.description.as_deref())?;
                Ok(Self::Reduction(c))
            }
            Self::Blacklist(mut c) => {
                let mut seen: HashSet<String> = HashSet::new();
                let mut plates: Vec<String> = Vec::with_capacity(c.car_numbers.len());
                for raw in &c.car_numbers {
                    let plate: String = normalize_car_number(raw)?;
                    if seen.insert(plate.clone()) {
                        plates.push(plate);
                    }
                }
                c.car_numbers = plates;
                c.message = validate_optional_text("message", c.message.as_deref())?;
                Ok(Self::Blacklist(c))
            }
            Self::Membership(c) => {
                validate_amount("fee", c.fee)?;
                if c.period_days == 0 {
                    return Err(invalid(String::from("period_days must be at least 1")));
                }
                if c.max_vehicles == 0 {
                    return Err(invalid(String::from("max_vehicles must be at least 1")));
                }
                Ok(Self::Membership(c))
            }
        }
    }
}

/// A stored policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Canonical identifier.
    pub policy_id: i64,
    /// Owning site. Immutable.
    pub site_id: i64,
    /// Name, unique within the site.
    pub name: String,
    /// Optional operator-facing code.
    pub code: Option<String>,
    /// Typed configuration; also determines the kind. Kind is immutable.
    pub config: PolicyConfig,
    /// Whether the policy was seeded by the system. Immutable.
    pub is_system: bool,
    /// Creation time.
    pub created_at: OffsetDateTime,
    /// Last modification time.
    pub updated_at: OffsetDateTime,
}

impl Policy {
    /// The policy kind.
    #[must_use]
    pub const fn policy_type(&self) -> PolicyType {
        self.config.policy_type()
    }

    /// Whether this is the selected blacklist of its site.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.config.is_selected()
    }

    /// Produces the policy that results from applying `update`.
    ///
    /// Only name, code and configuration can change.
    ///
    /// # Errors
    ///
    /// Returns an error if the new name or code is invalid or the config
    /// patch cannot be merged.
    pub fn apply_update(&self, update: &PolicyUpdate) -> Result<Self, DomainError> {
        let mut next: Self = self.clone();
        if let Some(name) = &update.name {
            next.name = validate_name("policy", name)?;
        }
        if let Some(code) = &update.code {
            next.code = validate_optional_text("code", code.as_deref())?;
        }
        if let Some(patch) = &update.config {
            next.config = self.config.merge(patch.clone())?;
        }
        Ok(next)
    }
}

/// A validated policy ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPolicy {
    /// Owning site.
    pub site_id: i64,
    /// Name.
    pub name: String,
    /// Optional code.
    pub code: Option<String>,
    /// Typed configuration.
    pub config: PolicyConfig,
    /// System flag.
    pub is_system: bool,
}

impl NewPolicy {
    /// Validates raw input into a new policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the name, code or configuration is invalid.
    pub fn new(
        site_id: i64,
        policy_type: PolicyType,
        name: &str,
        code: Option<&str>,
        config: Value,
        is_system: bool,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            site_id,
            name: validate_name("policy", name)?,
            code: validate_optional_text("code", code)?,
            config: PolicyConfig::from_value(policy_type, config)?,
            is_system,
        })
    }

    /// The policy kind.
    #[must_use]
    pub const fn policy_type(&self) -> PolicyType {
        self.config.policy_type()
    }
}

/// A partial policy update. Structural fields are not representable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyUpdate {
    /// New name.
    pub name: Option<String>,
    /// New code; `Some(None)` clears it.
    pub code: Option<Option<String>>,
    /// Config patch document, merged one level deep.
    pub config: Option<Value>,
}

impl PolicyUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.code.is_none() && self.config.is_none()
    }
}

/// Criteria for listing policies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyFilter {
    /// Restrict to one site.
    pub site_id: Option<i64>,
    /// Restrict to one kind.
    pub policy_type: Option<PolicyType>,
    /// Case-insensitive name substring.
    pub name_contains: Option<String>,
    /// Restrict by system flag.
    pub is_system: Option<bool>,
}

/// Sort key for listing policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicySort {
    /// By identifier.
    #[default]
    Id,
    /// By name.
    Name,
    /// By creation time.
    CreatedAt,
}

impl FromStr for PolicySort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "created_at" => Ok(Self::CreatedAt),
            _ => Err(DomainError::InvalidPage {
                reason: format!("unknown policy sort field '{s}'"),
            }),
        }
    }
}

/// Checks a replacement policy set before it is written.
///
/// # Errors
///
/// Returns `DomainError::DuplicatePolicyName` if two entries share a name,
/// or `DomainError::MultipleBlacklistSelected` if more than one blacklist is
/// selected.
pub fn validate_initial_policies(policies: &[NewPolicy]) -> Result<(), DomainError> {
    let mut names: HashSet<&str> = HashSet::new();
    for policy in policies {
        if !names.insert(policy.name.as_str()) {
            return Err(DomainError::DuplicatePolicyName(policy.name.clone()));
        }
    }

    let selected: usize = policies.iter().filter(|p| p.config.is_selected()).count();
    if selected > 1 {
        return Err(DomainError::MultipleBlacklistSelected { count: selected });
    }
    Ok(())
}
