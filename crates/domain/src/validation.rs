// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;

const MAX_NAME_LENGTH: usize = 100;
const MAX_TEXT_LENGTH: usize = 1000;
const MIN_CAR_NUMBER_LENGTH: usize = 2;
const MAX_CAR_NUMBER_LENGTH: usize = 20;

/// Validates an entity name and returns its trimmed form.
///
/// # Errors
///
/// Returns `DomainError::InvalidName` if the name is blank, too long, or
/// contains control characters.
pub fn validate_name(entity: &'static str, name: &str) -> Result<String, DomainError> {
    let trimmed: &str = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidName {
            entity,
            reason: String::from("must not be empty"),
        });
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::InvalidName {
            entity,
            reason: format!("must be at most {MAX_NAME_LENGTH} characters"),
        });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(DomainError::InvalidName {
            entity,
            reason: String::from("must not contain control characters"),
        });
    }
    Ok(trimmed.to_string())
}

/// Normalizes a vehicle plate for storage and lookup.
///
/// Whitespace is removed and ASCII letters are upper-cased, so `"12 ga 3456"`
/// and `"12GA3456"` refer to the same vehicle.
///
/// # Errors
///
/// Returns `DomainError::InvalidCarNumber` if the plate is empty, too short
/// or long, or contains characters other than letters, digits and `-`.
pub fn normalize_car_number(car_number: &str) -> Result<String, DomainError> {
    let normalized: String = car_number
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let length: usize = normalized.chars().count();
    if !(MIN_CAR_NUMBER_LENGTH..=MAX_CAR_NUMBER_LENGTH).contains(&length) {
        return Err(DomainError::InvalidCarNumber(format!(
            "'{car_number}' must be {MIN_CAR_NUMBER_LENGTH}-{MAX_CAR_NUMBER_LENGTH} characters"
        )));
    }
    if !normalized
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(DomainError::InvalidCarNumber(format!(
            "'{car_number}' contains unsupported characters"
        )));
    }
    Ok(normalized)
}

/// Validates that a monetary amount is not negative.
///
/// # Errors
///
/// Returns `DomainError::NegativeAmount` for negative values.
pub fn validate_amount(field: &'static str, amount: i64) -> Result<(), DomainError> {
    if amount < 0 {
        return Err(DomainError::NegativeAmount { field, amount });
    }
    Ok(())
}

/// Validates a controller TCP port.
///
/// # Errors
///
/// Returns `DomainError::InvalidPort` unless the port is within `1..=65535`.
pub fn validate_port(port: u32) -> Result<u16, DomainError> {
    match u16::try_from(port) {
        Ok(valid) if valid > 0 => Ok(valid),
        _ => Err(DomainError::InvalidPort(port)),
    }
}

/// Trims optional free text, mapping blank input to `None`.
///
/// # Errors
///
/// Returns `DomainError::InvalidText` if the text is too long.
pub fn validate_optional_text(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<String>, DomainError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed: &str = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_TEXT_LENGTH {
        return Err(DomainError::InvalidText {
            field,
            reason: format!("must be at most {MAX_TEXT_LENGTH} characters"),
        });
    }
    Ok(Some(trimmed.to_string()))
}
