//! Growth trend for one chart: the scored series, a summary and the overall velocity.

use super::{chart_series, TrendPoint, Velocity};
use crate::calculator::GrowthCalculator;
use crate::classification::Classification;
use crate::repositories::{DateRange, Measurement};
use crate::GrowthResult;
use chrono::NaiveDate;
use growth_types::{ChartType, Gender};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub measurement_count: usize,
    pub current_value: f64,
    pub current_z_score: f64,
    pub current_percentile: f64,
    pub current_classification: Classification,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthTrends {
    pub chart_type: ChartType,
    pub unit: String,
    pub trends: Vec<TrendPoint>,
    /// Present once at least two points remain.
    pub velocity: Option<Velocity>,
    /// Absent when no point remains.
    pub summary: Option<TrendSummary>,
}

/// Builds the trend for `chart_type`, restricted to `range` when given.
///
/// # Errors
///
/// Returns `NotFound` if the reference has no series for (gender, chart).
pub fn growth_trends(
    calculator: &GrowthCalculator,
    gender: Gender,
    chart_type: ChartType,
    history: &[Measurement],
    range: Option<&DateRange>,
) -> GrowthResult<GrowthTrends> {
    let in_range: Vec<Measurement> = history
        .iter()
        .filter(|m| range.map_or(true, |r| r.contains(m.date)))
        .cloned()
        .collect();
    let trends = chart_series(calculator, gender, chart_type, &in_range)?;

    let summary = match (trends.first(), trends.last()) {
        (Some(first), Some(last)) => Some(TrendSummary {
            first_date: first.date,
            last_date: last.date,
            measurement_count: trends.len(),
            current_value: last.value,
            current_z_score: last.z_score,
            current_percentile: last.percentile,
            current_classification: last.classification,
        }),
        _ => None,
    };

    let velocity = match (trends.first(), trends.last()) {
        (Some(first), Some(last)) if trends.len() >= 2 => {
            Velocity::between(chart_type, (first.date, first.value), (last.date, last.value))
        }
        _ => None,
    };

    Ok(GrowthTrends {
        chart_type,
        unit: chart_type.unit().to_string(),
        trends,
        velocity,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{calculator, patient, weight};
    use super::*;

    #[test]
    fn summary_tracks_latest_point() {
        let p = patient();
        let history = vec![weight(&p, 0, 3.3), weight(&p, 30, 3.9), weight(&p, 60, 4.4)];
        let trends =
            growth_trends(&calculator(), p.gender, ChartType::WeightForAge, &history, None).unwrap();

        assert_eq!(trends.trends.len(), 3);
        let summary = trends.summary.unwrap();
        assert_eq!(summary.measurement_count, 3);
        assert_eq!(summary.current_value, 4.4);
        assert_eq!(summary.first_date, p.date_of_birth);
        let velocity = trends.velocity.unwrap();
        assert_eq!(velocity.delta_days, 60);
        assert!((velocity.delta_value - 1.1).abs() < 1e-9);
    }

    #[test]
    fn range_limits_points() {
        let p = patient();
        let history = vec![weight(&p, 0, 3.3), weight(&p, 30, 3.9), weight(&p, 60, 4.4)];
        let range = DateRange::new(Some(p.date_of_birth + chrono::Duration::days(45)), None).unwrap();
        let trends = growth_trends(
            &calculator(),
            p.gender,
            ChartType::WeightForAge,
            &history,
            Some(&range),
        )
        .unwrap();
        assert_eq!(trends.trends.len(), 1);
        assert!(trends.velocity.is_none());
        assert!(trends.summary.is_some());
    }

    #[test]
    fn empty_history_has_no_summary() {
        let p = patient();
        let trends =
            growth_trends(&calculator(), p.gender, ChartType::WeightForAge, &[], None).unwrap();
        assert!(trends.trends.is_empty());
        assert!(trends.summary.is_none());
        assert!(trends.velocity.is_none());
    }
}
