//! Growth velocity between the first and last measurement in a window.

use super::dated_values;
use crate::constants::{VELOCITY_DAYS_PER_MONTH, VELOCITY_DAYS_PER_YEAR};
use crate::repositories::Measurement;
use chrono::NaiveDate;
use growth_types::ChartType;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_value: f64,
    pub end_value: f64,
    pub delta_value: f64,
    pub delta_days: i64,
    pub per_day: f64,
    pub per_month: f64,
    pub per_year: f64,
    pub unit: String,
}

impl Velocity {
    /// Rate between two dated values. `None` when they share a date.
    pub fn between(
        chart_type: ChartType,
        (start_date, start_value): (NaiveDate, f64),
        (end_date, end_value): (NaiveDate, f64),
    ) -> Option<Self> {
        let delta_days = (end_date - start_date).num_days();
        if delta_days <= 0 {
            return None;
        }
        let delta_value = end_value - start_value;
        let per_day = delta_value / delta_days as f64;
        Some(Self {
            start_date,
            end_date,
            start_value,
            end_value,
            delta_value,
            delta_days,
            per_day,
            per_month: per_day * VELOCITY_DAYS_PER_MONTH,
            per_year: per_day * VELOCITY_DAYS_PER_YEAR,
            unit: chart_type.unit().to_string(),
        })
    }
}

/// Velocity across the measurements inside `[start, end]` (open ends are unbounded).
///
/// Returns `None` when fewer than two measurements in the window carry a value for
/// `chart_type`. Not enough history is a normal state, not an error.
pub fn calculate_velocity(
    history: &[Measurement],
    chart_type: ChartType,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Option<Velocity> {
    let values: Vec<_> = dated_values(history, chart_type)
        .into_iter()
        .filter(|(date, _)| start.map_or(true, |s| *date >= s) && end.map_or(true, |e| *date <= e))
        .collect();
    if values.len() < 2 {
        return None;
    }
    Velocity::between(chart_type, values[0], values[values.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{patient, weight};
    use super::*;

    #[test]
    fn thirty_days_of_six_hundred_grams() {
        let p = patient();
        let history = vec![weight(&p, 60, 5.0), weight(&p, 90, 5.6)];
        let v = calculate_velocity(&history, ChartType::WeightForAge, None, None).unwrap();
        assert_eq!(v.delta_days, 30);
        assert!((v.per_month - 0.608).abs() < 0.01);
        assert!((v.per_year - 0.6 / 30.0 * 365.25).abs() < 1e-9);
        assert_eq!(v.unit, "kg");
    }

    #[test]
    fn zero_or_one_point_is_none() {
        let p = patient();
        assert!(calculate_velocity(&[], ChartType::WeightForAge, None, None).is_none());
        assert!(
            calculate_velocity(&[weight(&p, 10, 3.5)], ChartType::WeightForAge, None, None)
                .is_none()
        );
    }

    #[test]
    fn window_filters_points() {
        let p = patient();
        let history = vec![weight(&p, 0, 3.3), weight(&p, 30, 4.3), weight(&p, 60, 5.0)];
        let start = p.date_of_birth + chrono::Duration::days(30);
        let v = calculate_velocity(&history, ChartType::WeightForAge, Some(start), None).unwrap();
        assert_eq!(v.start_value, 4.3);
        assert_eq!(v.end_value, 5.0);

        let end = p.date_of_birth + chrono::Duration::days(10);
        assert!(calculate_velocity(&history, ChartType::WeightForAge, None, Some(end)).is_none());
    }

    #[test]
    fn same_day_points_have_no_rate() {
        let p = patient();
        let history = vec![weight(&p, 5, 3.4), weight(&p, 5, 3.5)];
        assert!(calculate_velocity(&history, ChartType::WeightForAge, None, None).is_none());
    }

    #[test]
    fn other_charts_are_ignored() {
        let p = patient();
        let history = vec![weight(&p, 0, 3.3), weight(&p, 30, 4.0)];
        assert!(calculate_velocity(&history, ChartType::HeightForAge, None, None).is_none());
    }
}
