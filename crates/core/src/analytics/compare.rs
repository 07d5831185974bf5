//! Comparing a patient's growth against a reference age, the chart percentiles, or expected
//! growth rates.

use super::{dated_values, velocity::Velocity};
use crate::calculator::GrowthCalculator;
use crate::config::VelocityThresholds;
use crate::constants::DEFAULT_VELOCITY_WINDOW_DAYS;
use crate::percentile::round_to;
use crate::repositories::{Measurement, PatientRecord};
use crate::{GrowthError, GrowthResult};
use growth_types::ChartType;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

pub const STATUS_NO_DATA: &str = "no_data";
pub const STATUS_INSUFFICIENT_DATA: &str = "insufficient_data";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    Age,
    Percentile,
    Velocity,
}

impl CompareMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareMode::Age => "age",
            CompareMode::Percentile => "percentile",
            CompareMode::Velocity => "velocity",
        }
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareMode {
    type Err = GrowthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "age" => Ok(CompareMode::Age),
            "percentile" => Ok(CompareMode::Percentile),
            "velocity" => Ok(CompareMode::Velocity),
            _ => Err(GrowthError::InvalidInput(format!(
                "unknown comparison mode '{s}', expected age, percentile or velocity"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompareParams {
    pub chart_type: ChartType,
    /// Required for [`CompareMode::Age`].
    pub reference_age_months: Option<f64>,
    /// Lookback for [`CompareMode::Velocity`]; defaults to 90 days.
    pub window_days: Option<i64>,
}

impl Default for CompareParams {
    fn default() -> Self {
        Self {
            chart_type: ChartType::WeightForAge,
            reference_age_months: None,
            window_days: None,
        }
    }
}

impl CompareParams {
    /// Stable fragment for cache keys.
    pub fn cache_fragment(&self) -> String {
        let opt = |v: Option<String>| v.unwrap_or_else(|| "*".into());
        format!(
            "{}:{}:{}",
            self.chart_type,
            opt(self.reference_age_months.map(|m| m.to_string())),
            opt(self.window_days.map(|d| d.to_string()))
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthComparison {
    pub mode: CompareMode,
    pub comparison: String,
    pub status: String,
    pub details: serde_json::Value,
}

impl GrowthComparison {
    fn no_data(mode: CompareMode, comparison: String) -> Self {
        Self {
            mode,
            comparison,
            status: STATUS_NO_DATA.to_string(),
            details: serde_json::Value::Null,
        }
    }
}

/// Compares a patient's history in the requested mode.
///
/// No usable measurement gives status `no_data`; it is never an error.
///
/// # Errors
///
/// Returns `InvalidInput` for missing or out-of-range parameters and `NotFound` if the reference
/// has no series for the patient's gender and chart.
pub fn compare_growth(
    calculator: &GrowthCalculator,
    patient: &PatientRecord,
    history: &[Measurement],
    mode: CompareMode,
    params: &CompareParams,
    thresholds: VelocityThresholds,
) -> GrowthResult<GrowthComparison> {
    match mode {
        CompareMode::Age => compare_age(history, params),
        CompareMode::Percentile => compare_percentile(calculator, patient, history, params),
        CompareMode::Velocity => compare_velocity(history, params, thresholds),
    }
}

fn compare_age(history: &[Measurement], params: &CompareParams) -> GrowthResult<GrowthComparison> {
    let reference_age_months = params.reference_age_months.ok_or_else(|| {
        GrowthError::InvalidInput("reference_age_months is required for age comparison".into())
    })?;
    if !reference_age_months.is_finite() || reference_age_months < 0.0 {
        return Err(GrowthError::InvalidInput(format!(
            "reference_age_months must be non-negative, got {reference_age_months}"
        )));
    }

    let comparison = format!("current age vs {reference_age_months} months");
    let Some(latest) = history.iter().max_by_key(|m| m.date) else {
        return Ok(GrowthComparison::no_data(CompareMode::Age, comparison));
    };

    let difference_months = round_to(latest.age_months - reference_age_months, 1);
    let status = if difference_months > 0.0 {
        "ahead"
    } else if difference_months < 0.0 {
        "behind"
    } else {
        "on_track"
    };

    Ok(GrowthComparison {
        mode: CompareMode::Age,
        comparison,
        status: status.to_string(),
        details: json!({
            "current_age_months": round_to(latest.age_months, 1),
            "reference_age_months": reference_age_months,
            "difference_months": difference_months,
            "measured_on": latest.date,
        }),
    })
}

fn compare_percentile(
    calculator: &GrowthCalculator,
    patient: &PatientRecord,
    history: &[Measurement],
    params: &CompareParams,
) -> GrowthResult<GrowthComparison> {
    let chart_type = params.chart_type;
    let comparison = format!("latest {chart_type} against the WHO reference");
    let latest = history
        .iter()
        .filter_map(|m| m.value_for(chart_type).map(|v| (m, v)))
        .max_by_key(|(m, _)| m.date);
    let Some((latest, value)) = latest else {
        return Ok(GrowthComparison::no_data(CompareMode::Percentile, comparison));
    };

    let result = calculator
        .calculate(patient.gender, chart_type, latest.age_days, value)?
        .rounded();

    Ok(GrowthComparison {
        mode: CompareMode::Percentile,
        comparison,
        status: result.classification.to_string(),
        details: json!({
            "chart_type": chart_type,
            "measured_on": latest.date,
            "age_months": round_to(latest.age_months, 1),
            "value": value,
            "unit": chart_type.unit(),
            "z_score": result.z_score,
            "percentile": result.percentile,
            "classification": result.classification,
        }),
    })
}

fn compare_velocity(
    history: &[Measurement],
    params: &CompareParams,
    thresholds: VelocityThresholds,
) -> GrowthResult<GrowthComparison> {
    let chart_type = params.chart_type;
    let window_days = params.window_days.unwrap_or(DEFAULT_VELOCITY_WINDOW_DAYS);
    if window_days <= 0 {
        return Err(GrowthError::InvalidInput(format!(
            "window_days must be positive, got {window_days}"
        )));
    }

    let comparison = format!("{chart_type} growth rate over the last {window_days} days");
    let values = dated_values(history, chart_type);
    let Some(&(end_date, _)) = values.last() else {
        return Ok(GrowthComparison::no_data(CompareMode::Velocity, comparison));
    };
    let start_date = chrono::Duration::try_days(window_days)
        .and_then(|window| end_date.checked_sub_signed(window))
        .ok_or_else(|| {
            GrowthError::InvalidInput(format!("window_days {window_days} is out of range"))
        })?;
    let window: Vec<_> = values.into_iter().filter(|(d, _)| *d >= start_date).collect();

    let velocity = match (window.first(), window.last()) {
        (Some(first), Some(last)) if window.len() >= 2 => Velocity::between(chart_type, *first, *last),
        _ => None,
    };
    let Some(velocity) = velocity else {
        return Ok(GrowthComparison {
            mode: CompareMode::Velocity,
            comparison,
            status: STATUS_INSUFFICIENT_DATA.to_string(),
            details: json!({ "measurements_in_window": window.len() }),
        });
    };

    let status = if velocity.per_month < thresholds.slow_below {
        "slow"
    } else if velocity.per_month > thresholds.fast_above {
        "fast"
    } else {
        "normal"
    };

    Ok(GrowthComparison {
        mode: CompareMode::Velocity,
        comparison,
        status: status.to_string(),
        details: json!({
            "per_month": velocity.per_month,
            "unit": velocity.unit,
            "slow_below": thresholds.slow_below,
            "fast_above": thresholds.fast_above,
            "velocity": velocity,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{calculator, patient, weight};
    use super::*;

    fn wfa() -> VelocityThresholds {
        VelocityThresholds::default_for(ChartType::WeightForAge)
    }

    #[test]
    fn age_mode_reports_ahead_by_two_months() {
        let p = patient();
        // 8 months of WHO age
        let history = vec![weight(&p, 30, 4.0), weight(&p, 244, 8.0)];
        let params = CompareParams {
            reference_age_months: Some(6.0),
            ..Default::default()
        };
        let cmp = compare_growth(&calculator(), &p, &history, CompareMode::Age, &params, wfa())
            .unwrap();
        assert_eq!(cmp.status, "ahead");
        assert_eq!(cmp.details["difference_months"], json!(2.0));
    }

    #[test]
    fn age_mode_behind_and_missing_reference() {
        let p = patient();
        let history = vec![weight(&p, 91, 6.0)];
        let params = CompareParams {
            reference_age_months: Some(6.0),
            ..Default::default()
        };
        let cmp = compare_growth(&calculator(), &p, &history, CompareMode::Age, &params, wfa())
            .unwrap();
        assert_eq!(cmp.status, "behind");

        let err = compare_growth(
            &calculator(),
            &p,
            &history,
            CompareMode::Age,
            &CompareParams::default(),
            wfa(),
        )
        .unwrap_err();
        assert!(matches!(err, GrowthError::InvalidInput(_)));
    }

    #[test]
    fn every_mode_reports_no_data_for_empty_history() {
        let p = patient();
        let params = CompareParams {
            reference_age_months: Some(6.0),
            ..Default::default()
        };
        for mode in [CompareMode::Age, CompareMode::Percentile, CompareMode::Velocity] {
            let cmp = compare_growth(&calculator(), &p, &[], mode, &params, wfa()).unwrap();
            assert_eq!(cmp.status, STATUS_NO_DATA, "{mode}");
        }
    }

    #[test]
    fn percentile_mode_classifies_latest() {
        let p = patient();
        let history = vec![weight(&p, 0, 2.0), weight(&p, 30, 3.3)];
        let cmp = compare_growth(
            &calculator(),
            &p,
            &history,
            CompareMode::Percentile,
            &CompareParams::default(),
            wfa(),
        )
        .unwrap();
        assert_eq!(cmp.status, "normal");
        assert_eq!(cmp.details["percentile"], json!(50.0));
    }

    #[test]
    fn velocity_mode_bands() {
        let p = patient();
        let fast = vec![weight(&p, 0, 3.3), weight(&p, 30, 4.3)];
        let slow = vec![weight(&p, 0, 3.3), weight(&p, 30, 3.32)];
        let normal = vec![weight(&p, 0, 3.3), weight(&p, 30, 3.6)];

        let status = |history: &[Measurement]| {
            compare_growth(
                &calculator(),
                &p,
                history,
                CompareMode::Velocity,
                &CompareParams::default(),
                wfa(),
            )
            .unwrap()
            .status
        };
        assert_eq!(status(&fast), "fast");
        assert_eq!(status(&slow), "slow");
        assert_eq!(status(&normal), "normal");
        assert_eq!(status(&[weight(&p, 0, 3.3)]), STATUS_INSUFFICIENT_DATA);
    }

    #[test]
    fn velocity_window_ends_at_latest_measurement() {
        let p = patient();
        // Only the last two fall inside a 30-day window.
        let history = vec![weight(&p, 0, 1.0), weight(&p, 100, 6.0), weight(&p, 120, 6.05)];
        let params = CompareParams {
            window_days: Some(30),
            ..Default::default()
        };
        let cmp = compare_growth(&calculator(), &p, &history, CompareMode::Velocity, &params, wfa())
            .unwrap();
        assert_eq!(cmp.status, "slow");
    }

    #[test]
    fn oversized_velocity_window_is_invalid() {
        let p = patient();
        let history = vec![weight(&p, 0, 3.3), weight(&p, 30, 4.3)];
        for window_days in [1_000_000_000, i64::MAX] {
            let params = CompareParams {
                window_days: Some(window_days),
                ..Default::default()
            };
            let err =
                compare_growth(&calculator(), &p, &history, CompareMode::Velocity, &params, wfa())
                    .unwrap_err();
            assert!(matches!(err, GrowthError::InvalidInput(_)));
        }
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Velocity".parse::<CompareMode>().unwrap(), CompareMode::Velocity);
        assert!("height".parse::<CompareMode>().is_err());
    }
}
