//! Z-score calculation against the reference store.
//!
//! Pipeline: reference lookup -> interpolation -> LMS transform -> percentile + classification.
//! Both the interpolated parameters and the final result are memoised under content-addressed
//! keys; identical inputs always produce identical outputs, so these entries are never
//! invalidated.

use crate::cache::{get_or_compute, CacheProvider, CachePolicy};
use crate::classification::{classify, Classification};
use crate::constants::{PERCENTILE_DECIMALS, Z_SCORE_DECIMALS};
use crate::interpolation::interpolate;
use crate::lms::{self, LmsParams};
use crate::percentile::{percentile, round_to};
use crate::reference::ReferenceStore;
use crate::validation::{validate_age_days, validate_measurement_value};
use crate::GrowthResult;
use growth_types::{ChartType, Gender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reference curve values at the measurement's age.
///
/// An SD line is `None` when the interpolated parameters place no measurement at that Z.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceValues {
    pub median: f64,
    pub sd2neg: Option<f64>,
    pub sd2pos: Option<f64>,
}

/// Outcome of assessing one measurement against the reference.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZScoreResult {
    pub z_score: f64,
    pub percentile: f64,
    pub classification: Classification,
    pub reference_values: ReferenceValues,
}

impl ZScoreResult {
    /// Display precision: Z to 3 decimals, percentile to 1.
    pub fn rounded(&self) -> Self {
        Self {
            z_score: round_to(self.z_score, Z_SCORE_DECIMALS),
            percentile: round_to(self.percentile, PERCENTILE_DECIMALS),
            ..*self
        }
    }
}

#[derive(Clone)]
pub struct GrowthCalculator {
    store: Arc<dyn ReferenceStore>,
    cache: Arc<dyn CacheProvider>,
}

impl GrowthCalculator {
    pub fn new(store: Arc<dyn ReferenceStore>, cache: Arc<dyn CacheProvider>) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &dyn ReferenceStore {
        self.store.as_ref()
    }

    fn lms_at(
        &self,
        gender: Gender,
        chart_type: ChartType,
        age_days: u32,
    ) -> GrowthResult<LmsParams> {
        let key = format!("ref:{gender}:{chart_type}:{age_days}");
        get_or_compute(
            self.cache.as_ref(),
            &key,
            &CachePolicy::immutable(),
            || {
                let bracket = self.store.lookup(gender, chart_type, age_days)?;
                Ok(interpolate(&bracket, age_days))
            },
        )
    }

    /// Assesses `value` for a child of `gender` aged `age_days` on `chart_type`.
    ///
    /// The result carries full precision; call [`ZScoreResult::rounded`] for display.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a negative age or non-positive value, and `NotFound` if no
    /// reference rows exist for the (gender, chart) pair.
    pub fn calculate(
        &self,
        gender: Gender,
        chart_type: ChartType,
        age_days: i64,
        value: f64,
    ) -> GrowthResult<ZScoreResult> {
        let age_days = validate_age_days(age_days)?;
        let value = validate_measurement_value(chart_type.as_str(), value)?;

        let key = format!("z:{gender}:{chart_type}:{age_days}:{value}");
        get_or_compute(
            self.cache.as_ref(),
            &key,
            &CachePolicy::immutable(),
            || {
                let params = self.lms_at(gender, chart_type, age_days)?;
                let z = lms::z_score(value, &params)?;
                Ok(ZScoreResult {
                    z_score: z,
                    percentile: percentile(z),
                    classification: classify(chart_type, z),
                    reference_values: ReferenceValues {
                        median: params.m,
                        sd2neg: lms::value_at_z(-2.0, &params).ok(),
                        sd2pos: lms::value_at_z(2.0, &params).ok(),
                    },
                })
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MokaCache, NoopCache};
    use crate::reference::{ReferencePoint, ReferenceTable};
    use crate::GrowthError;

    fn flat_table() -> ReferenceTable {
        let row = |age_days| {
            ReferencePoint::from_lms(
                Gender::Male,
                ChartType::WeightForAge,
                age_days,
                LmsParams::new(1.0, 3.3, 0.15).unwrap(),
            )
            .unwrap()
        };
        ReferenceTable::from_points("test", [row(0), row(30)]).unwrap()
    }

    fn calculator(cache: Arc<dyn CacheProvider>) -> GrowthCalculator {
        GrowthCalculator::new(Arc::new(flat_table()), cache)
    }

    #[test]
    fn median_at_interpolated_age_is_normal() {
        let calc = calculator(Arc::new(NoopCache));
        let result = calc
            .calculate(Gender::Male, ChartType::WeightForAge, 15, 3.3)
            .unwrap();
        assert!(result.z_score.abs() < 1e-9);
        assert!((result.percentile - 50.0).abs() < 0.01);
        assert_eq!(result.classification, Classification::Normal);
        assert!((result.reference_values.median - 3.3).abs() < 1e-12);
        // L = 1: SD = M * S
        let sd2pos = result.reference_values.sd2pos.unwrap();
        assert!((sd2pos - (3.3 + 2.0 * 3.3 * 0.15)).abs() < 1e-9);
    }

    #[test]
    fn negative_age_fails_before_lookup() {
        let calc = calculator(Arc::new(NoopCache));
        let err = calc
            .calculate(Gender::Male, ChartType::WeightForAge, -3, 3.3)
            .unwrap_err();
        assert!(matches!(err, GrowthError::InvalidInput(_)));
    }

    #[test]
    fn non_positive_value_is_invalid() {
        let calc = calculator(Arc::new(NoopCache));
        let err = calc
            .calculate(Gender::Male, ChartType::WeightForAge, 10, 0.0)
            .unwrap_err();
        assert!(matches!(err, GrowthError::InvalidInput(_)));
    }

    #[test]
    fn missing_series_is_not_found() {
        let calc = calculator(Arc::new(NoopCache));
        let err = calc
            .calculate(Gender::Female, ChartType::HeightForAge, 10, 50.0)
            .unwrap_err();
        assert!(matches!(err, GrowthError::NotFound(_)));
    }

    #[test]
    fn results_are_memoised_by_content() {
        let cache = Arc::new(MokaCache::new(100));
        let calc = calculator(cache.clone());
        calc.calculate(Gender::Male, ChartType::WeightForAge, 15, 3.6)
            .unwrap();
        assert!(cache.get("z:MALE:WFA:15:3.6").is_some());
        assert!(cache.get("ref:MALE:WFA:15").is_some());
    }

    #[test]
    fn undefined_sd_line_does_not_fail_the_z_score() {
        // Both rows are valid, but halfway L*S = 5.05 * 0.505 puts 1 + L*S*(-2) below zero.
        let row = |age_days, l, s| {
            ReferencePoint::from_lms(
                Gender::Male,
                ChartType::WeightForAge,
                age_days,
                LmsParams::new(l, 3.3, s).unwrap(),
            )
            .unwrap()
        };
        let table =
            ReferenceTable::from_points("test", [row(0, 10.0, 0.01), row(30, 0.1, 1.0)]).unwrap();
        let calc = GrowthCalculator::new(Arc::new(table), Arc::new(NoopCache));

        let result = calc
            .calculate(Gender::Male, ChartType::WeightForAge, 15, 3.3)
            .unwrap();
        assert!(result.z_score.abs() < 1e-9);
        assert_eq!(result.reference_values.sd2neg, None);
        assert!(result.reference_values.sd2pos.is_some());
    }

    #[test]
    fn rounding_applies_display_precision() {
        let calc = calculator(Arc::new(NoopCache));
        let result = calc
            .calculate(Gender::Male, ChartType::WeightForAge, 0, 3.7)
            .unwrap()
            .rounded();
        // (3.7 / 3.3 - 1) / 0.15 = 0.80808...
        assert_eq!(result.z_score, 0.808);
        assert_eq!(result.percentile, 79.0);
    }
}
