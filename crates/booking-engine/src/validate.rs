//! Field validators for the booking dialogue.
//!
//! Each validator trims its input and returns the normalized value.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::request::{Vehicle, Vin};

/// Oldest accepted manufacture year.
pub const MIN_YEAR: u16 = 1990;

static MAKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\p{L}+$").unwrap());
static MODEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\p{L}0-9]+$").unwrap());
static VIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").unwrap());
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[0-9]{9,15}$").unwrap());

/// `"Audi A4"` → make `Audi`, model `A4`. Exactly two whitespace-separated tokens.
pub fn parse_vehicle(input: &str) -> Result<Vehicle, ValidationError> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let [make, model] = tokens.as_slice() else {
        return Err(ValidationError::VehicleFormat);
    };
    if !MAKE_RE.is_match(make) {
        return Err(ValidationError::VehicleMake);
    }
    if !MODEL_RE.is_match(model) {
        return Err(ValidationError::VehicleModel);
    }
    Ok(Vehicle {
        make: (*make).to_string(),
        model: (*model).to_string(),
    })
}

/// Exactly four ASCII digits, value at least [`MIN_YEAR`].
pub fn parse_year(input: &str) -> Result<u16, ValidationError> {
    let input = input.trim();
    if input.len() != 4 || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::Year);
    }
    let year: u16 = input.parse().map_err(|_| ValidationError::Year)?;
    if year < MIN_YEAR {
        return Err(ValidationError::Year);
    }
    Ok(year)
}

/// 17 characters from `A-H J-N P R-Z 0-9`, case-insensitive, normalized to
/// uppercase.
pub fn parse_vin(input: &str) -> Result<Vin, ValidationError> {
    let upper = input.trim().to_uppercase();
    if !VIN_RE.is_match(&upper) {
        return Err(ValidationError::Vin);
    }
    Ok(Vin(upper))
}

/// Optional leading `+`, then 9 to 15 digits.
pub fn parse_phone(input: &str) -> Result<String, ValidationError> {
    let input = input.trim();
    if !PHONE_RE.is_match(input) {
        return Err(ValidationError::Phone);
    }
    Ok(input.to_string())
}

/// Any non-blank text.
pub fn parse_issue(input: &str) -> Result<String, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::Issue);
    }
    Ok(input.to_string())
}
