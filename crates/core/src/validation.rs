//! Input validation utilities.
//!
//! Everything here runs at a function boundary, before any numeric work begins.

use crate::constants::MAX_PROJECTION_HORIZON_MONTHS;
use crate::{GrowthError, GrowthResult};
use chrono::NaiveDate;

/// Validates an age in days and narrows it to the reference-table key type.
///
/// Ages beyond `u32::MAX` days saturate; they clamp to the last reference row anyway.
pub fn validate_age_days(age_days: i64) -> GrowthResult<u32> {
    if age_days < 0 {
        return Err(GrowthError::InvalidInput(format!(
            "age_days must be non-negative, got {age_days}"
        )));
    }
    Ok(u32::try_from(age_days).unwrap_or(u32::MAX))
}

/// Validates that a raw measurement is a positive finite number.
pub fn validate_measurement_value(name: &str, value: f64) -> GrowthResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(GrowthError::InvalidInput(format!(
            "{name} must be a positive number, got {value}"
        )));
    }
    Ok(value)
}

pub fn validate_date_window(start: NaiveDate, end: NaiveDate) -> GrowthResult<()> {
    if start > end {
        return Err(GrowthError::InvalidInput(format!(
            "start date {start} is after end date {end}"
        )));
    }
    Ok(())
}

pub fn validate_horizon_months(horizon_months: u32) -> GrowthResult<u32> {
    if horizon_months == 0 || horizon_months > MAX_PROJECTION_HORIZON_MONTHS {
        return Err(GrowthError::InvalidInput(format!(
            "horizon_months must be between 1 and {MAX_PROJECTION_HORIZON_MONTHS}, got {horizon_months}"
        )));
    }
    Ok(horizon_months)
}
