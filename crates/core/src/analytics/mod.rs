//! Patient-level growth analytics: trends, velocity, projection and comparison.
//!
//! Every function here is a pure function of the measurement history it is handed. Fetching,
//! tenant checks and caching live in [`crate::service`].

pub mod compare;
pub mod projection;
pub mod trends;
pub mod velocity;

pub use compare::{compare_growth, CompareMode, CompareParams, GrowthComparison};
pub use projection::{project_growth, step_confidence, GrowthProjection, ProjectedPoint};
pub use trends::{growth_trends, GrowthTrends, TrendSummary};
pub use velocity::{calculate_velocity, Velocity};

use crate::calculator::GrowthCalculator;
use crate::classification::Classification;
use crate::constants::{PERCENTILE_DECIMALS, Z_SCORE_DECIMALS};
use crate::percentile::round_to;
use crate::repositories::Measurement;
use crate::{GrowthError, GrowthResult};
use chrono::NaiveDate;
use growth_types::{ChartType, Gender};
use serde::{Deserialize, Serialize};

/// One measurement plotted on a chart, with its Z-score and percentile at display precision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub age_months: f64,
    pub value: f64,
    pub z_score: f64,
    pub percentile: f64,
    pub classification: Classification,
}

/// Scores each measurement that recorded a value for `chart_type`, ascending by date.
///
/// A point whose value cannot be scored is skipped with a warning rather than failing the whole
/// series; a missing reference series still fails with `NotFound`.
pub(crate) fn chart_series(
    calculator: &GrowthCalculator,
    gender: Gender,
    chart_type: ChartType,
    history: &[Measurement],
) -> GrowthResult<Vec<TrendPoint>> {
    let mut points = Vec::with_capacity(history.len());
    for measurement in history {
        let Some(value) = measurement.value_for(chart_type) else {
            continue;
        };
        match calculator.calculate(gender, chart_type, measurement.age_days, value) {
            Ok(result) => points.push(TrendPoint {
                date: measurement.date,
                age_months: measurement.age_months,
                value,
                z_score: round_to(result.z_score, Z_SCORE_DECIMALS),
                percentile: round_to(result.percentile, PERCENTILE_DECIMALS),
                classification: result.classification,
            }),
            Err(GrowthError::InvalidInput(reason)) => {
                tracing::warn!(
                    measurement_id = %measurement.id,
                    chart_type = %chart_type,
                    %reason,
                    "skipping unscorable measurement"
                );
            }
            Err(other) => return Err(other),
        }
    }
    points.sort_by_key(|p| p.date);
    Ok(points)
}

/// `(date, value)` pairs for `chart_type`, ascending by date.
pub(crate) fn dated_values(history: &[Measurement], chart_type: ChartType) -> Vec<(NaiveDate, f64)> {
    let mut values: Vec<_> = history
        .iter()
        .filter_map(|m| m.value_for(chart_type).map(|v| (m.date, v)))
        .collect();
    values.sort_by_key(|(date, _)| *date);
    values
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::cache::NoopCache;
    use crate::calculator::GrowthCalculator;
    use crate::lms::LmsParams;
    use crate::reference::{ReferencePoint, ReferenceTable};
    use crate::repositories::{Measurement, PatientRecord};
    use crate::age_days_to_months;
    use chrono::NaiveDate;
    use growth_types::{ChartType, Gender, NonEmptyText, PatientId};
    use std::sync::Arc;
    use uuid::Uuid;

    /// Flat WFA table (L=1, M=3.3, S=0.15) for boys aged 0..=730 days.
    pub fn calculator() -> GrowthCalculator {
        let row = |age_days| {
            ReferencePoint::from_lms(
                Gender::Male,
                ChartType::WeightForAge,
                age_days,
                LmsParams::new(1.0, 3.3, 0.15).unwrap(),
            )
            .unwrap()
        };
        let table = ReferenceTable::from_points("test", [row(0), row(730)]).unwrap();
        GrowthCalculator::new(Arc::new(table), Arc::new(NoopCache))
    }

    pub fn patient() -> PatientRecord {
        PatientRecord {
            id: PatientId::new(),
            date_of_birth: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            gender: Gender::Male,
            tenant_id: NonEmptyText::new("clinic-a").unwrap(),
        }
    }

    /// A weight-only measurement taken `age_days` after 2024-01-01.
    pub fn weight(patient: &PatientRecord, age_days: i64, kg: f64) -> Measurement {
        Measurement {
            id: Uuid::new_v4(),
            patient_id: patient.id.clone(),
            date: patient.date_of_birth + chrono::Duration::days(age_days),
            age_days,
            age_months: age_days_to_months(age_days),
            weight: Some(kg),
            height: None,
            head_circumference: None,
            bmi: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{calculator, patient, weight};
    use super::*;

    #[test]
    fn series_skips_missing_values_and_sorts() {
        let p = patient();
        let mut no_weight = weight(&p, 5, 3.4);
        no_weight.weight = None;
        no_weight.height = Some(50.0);
        let history = vec![weight(&p, 30, 3.6), no_weight, weight(&p, 0, 3.3)];

        let series = chart_series(&calculator(), p.gender, ChartType::WeightForAge, &history).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].value, 3.3);
        assert_eq!(series[0].z_score, 0.0);
        assert_eq!(series[0].percentile, 50.0);
        assert!(series[0].date < series[1].date);
    }

    #[test]
    fn series_fails_when_reference_is_missing() {
        let p = patient();
        let err = chart_series(&calculator(), Gender::Female, ChartType::WeightForAge, &[weight(&p, 0, 3.3)])
            .unwrap_err();
        assert!(matches!(err, GrowthError::NotFound(_)));
    }
}
