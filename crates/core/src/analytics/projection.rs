//! Linear growth projection.
//!
//! The rate is the mean monthly rate over the most recent intervals. Each projected step carries
//! a confidence of `max(0.7 - 0.05 * step, 0.3)`. That decay is a placeholder heuristic with no
//! WHO or clinical validation behind it; do not present it as a statistical interval.

use super::dated_values;
use crate::calculator::GrowthCalculator;
use crate::constants::{
    PERCENTILE_DECIMALS, PROJECTION_RATE_INTERVALS, PROJECTION_STEP_MONTHS,
    VELOCITY_DAYS_PER_MONTH, Z_SCORE_DECIMALS,
};
use crate::percentile::round_to;
use crate::repositories::{age_in_days, Measurement, PatientRecord};
use crate::validation::validate_horizon_months;
use crate::{age_days_to_months, GrowthError, GrowthResult};
use chrono::{Months, NaiveDate};
use growth_types::ChartType;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub months_ahead: u32,
    pub date: NaiveDate,
    pub age_months: f64,
    pub value: f64,
    /// `None` when the projected value cannot be scored (e.g. it fell to zero).
    pub z_score: Option<f64>,
    pub percentile: Option<f64>,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthProjection {
    pub chart_type: ChartType,
    pub base_date: NaiveDate,
    pub base_value: f64,
    pub average_monthly_growth: f64,
    pub intervals_used: usize,
    /// Mean of the per-step confidences.
    pub confidence: f64,
    pub projections: Vec<ProjectedPoint>,
}

/// Confidence attached to the `step`-th projected point (1-based).
pub fn step_confidence(step: u32) -> f64 {
    (0.7 - 0.05 * f64::from(step)).max(0.3)
}

/// Month offsets projected for a horizon: every step, plus the horizon itself.
fn projection_offsets(horizon_months: u32) -> Vec<u32> {
    let mut offsets: Vec<u32> = (1..=horizon_months / PROJECTION_STEP_MONTHS)
        .map(|i| i * PROJECTION_STEP_MONTHS)
        .collect();
    if horizon_months % PROJECTION_STEP_MONTHS != 0 {
        offsets.push(horizon_months);
    }
    offsets
}

/// Projects `chart_type` forward `horizon_months` from the latest measurement.
///
/// Returns `Ok(None)` when fewer than two dated values are available.
///
/// # Errors
///
/// Returns `InvalidInput` for a horizon outside `1..=60` months and `NotFound` if the reference
/// has no series for the patient's gender and chart.
pub fn project_growth(
    calculator: &GrowthCalculator,
    patient: &PatientRecord,
    chart_type: ChartType,
    history: &[Measurement],
    horizon_months: u32,
) -> GrowthResult<Option<GrowthProjection>> {
    let horizon_months = validate_horizon_months(horizon_months)?;
    let values = dated_values(history, chart_type);
    if values.len() < 2 {
        return Ok(None);
    }

    let recent = &values[values.len().saturating_sub(PROJECTION_RATE_INTERVALS + 1)..];
    let rates: Vec<f64> = recent
        .windows(2)
        .filter_map(|pair| {
            let days = (pair[1].0 - pair[0].0).num_days();
            (days > 0).then(|| (pair[1].1 - pair[0].1) / days as f64 * VELOCITY_DAYS_PER_MONTH)
        })
        .collect();
    if rates.is_empty() {
        return Ok(None);
    }
    let average_monthly_growth = rates.iter().sum::<f64>() / rates.len() as f64;

    let (base_date, base_value) = values[values.len() - 1];
    let mut projections = Vec::new();
    for (step, months_ahead) in (1u32..).zip(projection_offsets(horizon_months)) {
        let date = base_date
            .checked_add_months(Months::new(months_ahead))
            .ok_or_else(|| {
                GrowthError::InvalidInput(format!("{base_date} + {months_ahead} months overflows"))
            })?;
        let age_days = age_in_days(patient.date_of_birth, date)?;
        let value = base_value + average_monthly_growth * f64::from(months_ahead);

        let scored = match calculator.calculate(patient.gender, chart_type, age_days, value) {
            Ok(result) => Some(result),
            Err(GrowthError::InvalidInput(_)) => None,
            Err(other) => return Err(other),
        };

        projections.push(ProjectedPoint {
            months_ahead,
            date,
            age_months: age_days_to_months(age_days),
            value,
            z_score: scored.map(|r| round_to(r.z_score, Z_SCORE_DECIMALS)),
            percentile: scored.map(|r| round_to(r.percentile, PERCENTILE_DECIMALS)),
            confidence: step_confidence(step),
        });
    }

    let confidence =
        projections.iter().map(|p| p.confidence).sum::<f64>() / projections.len() as f64;

    Ok(Some(GrowthProjection {
        chart_type,
        base_date,
        base_value,
        average_monthly_growth,
        intervals_used: rates.len(),
        confidence,
        projections,
    }))
}
