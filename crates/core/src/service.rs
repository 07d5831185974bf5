//! Growth service.
//!
//! The facade API surfaces call. It fetches the patient, checks the caller's tenant, loads the
//! measurement history and hands it to the pure analytics in [`crate::analytics`]. Per-patient
//! results are cached under the `patient:<id>` tag and dropped whenever that patient's
//! measurements change.

use crate::access::AccessContext;
use crate::analytics::{
    self, CompareMode, CompareParams, GrowthComparison, GrowthProjection, GrowthTrends, Velocity,
};
use crate::cache::{get_or_compute, patient_tag, CachePolicy, CacheProvider};
use crate::calculator::{GrowthCalculator, ZScoreResult};
use crate::reference::ReferenceStore;
use crate::repositories::{DateRange, GrowthRepository, Measurement, NewMeasurement, PatientRecord};
use crate::{CoreConfig, GrowthError, GrowthResult};
use chrono::NaiveDate;
use growth_types::{ChartType, Gender, PatientId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// One age on a plotted reference curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub age_days: u32,
    pub age_months: f64,
    pub sd3neg: f64,
    pub sd2neg: f64,
    pub median: f64,
    pub sd2pos: f64,
    pub sd3pos: f64,
}

/// Reference curves for one (gender, chart) pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthChart {
    pub gender: Gender,
    pub chart_type: ChartType,
    pub unit: String,
    pub source: String,
    pub points: Vec<ChartPoint>,
}

/// A stored measurement and the result computed for each chart it has a value for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedMeasurement {
    pub measurement: Measurement,
    pub results: BTreeMap<ChartType, ZScoreResult>,
}

#[derive(Clone)]
pub struct GrowthService {
    cfg: Arc<CoreConfig>,
    calculator: GrowthCalculator,
    repository: Arc<dyn GrowthRepository>,
    cache: Arc<dyn CacheProvider>,
}

impl GrowthService {
    /// Creates a new instance of GrowthService.
    ///
    /// The same `cache` backs both the calculator's content-addressed entries and the
    /// per-patient analytics.
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn ReferenceStore>,
        repository: Arc<dyn GrowthRepository>,
        cache: Arc<dyn CacheProvider>,
    ) -> Self {
        Self {
            cfg,
            calculator: GrowthCalculator::new(store, cache.clone()),
            repository,
            cache,
        }
    }

    pub fn calculator(&self) -> &GrowthCalculator {
        &self.calculator
    }

    /// Assesses a single measurement, rounded for display.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a negative age or non-positive value, and `NotFound` if the
    /// reference has no series for (gender, chart).
    pub fn calculate_z_score(
        &self,
        gender: Gender,
        chart_type: ChartType,
        age_days: i64,
        value: f64,
    ) -> GrowthResult<ZScoreResult> {
        self.calculator
            .calculate(gender, chart_type, age_days, value)
            .map(|r| r.rounded())
    }

    /// Reference curves (median, +/-2 SD, +/-3 SD) for plotting.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the reference has no series for (gender, chart).
    pub fn growth_chart(&self, gender: Gender, chart_type: ChartType) -> GrowthResult<GrowthChart> {
        let store = self.calculator.store();
        let rows = store.rows(gender, chart_type);
        if rows.is_empty() {
            return Err(GrowthError::NotFound(format!(
                "no reference data for {gender} {chart_type}"
            )));
        }
        Ok(GrowthChart {
            gender,
            chart_type,
            unit: chart_type.unit().to_string(),
            source: store.source().to_string(),
            points: rows
                .iter()
                .map(|row| ChartPoint {
                    age_days: row.age_days,
                    age_months: row.age_months,
                    sd3neg: row.sd.sd3neg,
                    sd2neg: row.sd.sd2neg,
                    median: row.lms.m,
                    sd2pos: row.sd.sd2pos,
                    sd3pos: row.sd.sd3pos,
                })
                .collect(),
        })
    }

    fn authorised_patient(
        &self,
        ctx: &AccessContext,
        patient_id: &PatientId,
    ) -> GrowthResult<PatientRecord> {
        let patient = self.repository.fetch_patient(patient_id)?;
        ctx.authorise(&patient)?;
        Ok(patient)
    }

    fn patient_policy(&self, patient_id: &PatientId) -> CachePolicy {
        CachePolicy::patient(patient_id, self.cfg.trend_ttl())
    }

    /// Cache key for per-patient analytics.
    ///
    /// Must be built before the history is read: the key carries the patient's current cache
    /// generation, so a result computed while a write lands is stored under a key no later read
    /// will ask for.
    fn patient_key(&self, kind: &str, patient_id: &PatientId, rest: &str) -> String {
        let generation = self.cache.generation(&patient_tag(patient_id));
        format!("{kind}:{patient_id}:g{generation}:{rest}")
    }

    /// Scored series, summary and velocity for one chart.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Caller's tenant.
    /// * `patient_id` - Patient whose history is read.
    /// * `chart_type` - Chart to plot.
    /// * `range` - Optional inclusive date filter.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown patient or missing reference series, and `Forbidden`
    /// when the patient belongs to another tenant.
    pub fn get_growth_trends(
        &self,
        ctx: &AccessContext,
        patient_id: &PatientId,
        chart_type: ChartType,
        range: Option<DateRange>,
    ) -> GrowthResult<GrowthTrends> {
        let patient = self.authorised_patient(ctx, patient_id)?;
        let range = range.unwrap_or_default();
        let key = self.patient_key(
            "trends",
            patient_id,
            &format!("{chart_type}:{}", range.cache_fragment()),
        );
        get_or_compute(
            self.cache.as_ref(),
            &key,
            &self.patient_policy(patient_id),
            || {
                let history = self.repository.list_measurements(patient_id, Some(&range))?;
                analytics::growth_trends(
                    &self.calculator,
                    patient.gender,
                    chart_type,
                    &history,
                    Some(&range),
                )
            },
        )
    }

    /// Velocity between the first and last measurement in the window.
    ///
    /// Returns `Ok(None)` when fewer than two measurements qualify.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `start` is after `end`, plus the patient errors of
    /// [`Self::get_growth_trends`].
    pub fn calculate_velocity(
        &self,
        ctx: &AccessContext,
        patient_id: &PatientId,
        chart_type: ChartType,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> GrowthResult<Option<Velocity>> {
        let range = DateRange::new(start, end)?;
        self.authorised_patient(ctx, patient_id)?;
        let key = self.patient_key(
            "velocity",
            patient_id,
            &format!("{chart_type}:{}", range.cache_fragment()),
        );
        get_or_compute(
            self.cache.as_ref(),
            &key,
            &self.patient_policy(patient_id),
            || {
                let history = self.repository.list_measurements(patient_id, Some(&range))?;
                Ok(analytics::calculate_velocity(
                    &history, chart_type, range.start, range.end,
                ))
            },
        )
    }

    /// Projects a chart forward in 3-month steps.
    ///
    /// Returns `Ok(None)` when fewer than two measurements carry a value for the chart.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a horizon outside `1..=60` months, plus the patient errors of
    /// [`Self::get_growth_trends`].
    pub fn get_growth_projection(
        &self,
        ctx: &AccessContext,
        patient_id: &PatientId,
        chart_type: ChartType,
        horizon_months: u32,
    ) -> GrowthResult<Option<GrowthProjection>> {
        crate::validation::validate_horizon_months(horizon_months)?;
        let patient = self.authorised_patient(ctx, patient_id)?;
        let key = self.patient_key(
            "projection",
            patient_id,
            &format!("{chart_type}:{horizon_months}"),
        );
        get_or_compute(
            self.cache.as_ref(),
            &key,
            &self.patient_policy(patient_id),
            || {
                let history = self.repository.list_measurements(patient_id, None)?;
                analytics::project_growth(
                    &self.calculator,
                    &patient,
                    chart_type,
                    &history,
                    horizon_months,
                )
            },
        )
    }

    /// Compares growth by age, percentile or velocity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for missing mode parameters, plus the patient errors of
    /// [`Self::get_growth_trends`].
    pub fn compare_growth(
        &self,
        ctx: &AccessContext,
        patient_id: &PatientId,
        mode: CompareMode,
        params: &CompareParams,
    ) -> GrowthResult<GrowthComparison> {
        let patient = self.authorised_patient(ctx, patient_id)?;
        let key = self.patient_key(
            "compare",
            patient_id,
            &format!("{mode}:{}", params.cache_fragment()),
        );
        get_or_compute(
            self.cache.as_ref(),
            &key,
            &self.patient_policy(patient_id),
            || {
                let history = self.repository.list_measurements(patient_id, None)?;
                analytics::compare_growth(
                    &self.calculator,
                    &patient,
                    &history,
                    mode,
                    params,
                    self.cfg.velocity_thresholds(params.chart_type),
                )
            },
        )
    }

    /// Stores a new measurement and its growth results.
    ///
    /// Age is derived from the patient's date of birth. A result is computed for each chart the
    /// measurement has a value for. The patient's cached analytics are invalidated as soon as the
    /// measurement is saved, then each result is persisted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a non-positive value, an empty measurement, or a date before
    /// birth; `Forbidden` for another tenant's patient; `NotFound` for an unknown patient.
    pub fn record_measurement(
        &self,
        ctx: &AccessContext,
        patient_id: &PatientId,
        input: NewMeasurement,
    ) -> GrowthResult<RecordedMeasurement> {
        let patient = self.authorised_patient(ctx, patient_id)?;
        let measurement = Measurement::new(&patient, input)?;

        let mut results = BTreeMap::new();
        for chart_type in ChartType::ALL {
            let Some(value) = measurement.value_for(chart_type) else {
                continue;
            };
            let result = self
                .calculator
                .calculate(patient.gender, chart_type, measurement.age_days, value)?
                .rounded();
            results.insert(chart_type, result);
        }

        self.repository.save_measurement(&measurement)?;
        self.cache.invalidate(&[patient_tag(patient_id)]);
        for (chart_type, result) in &results {
            self.repository
                .persist_growth_result(&measurement, *chart_type, result)?;
        }

        tracing::info!(
            patient_id = %patient_id,
            measurement_id = %measurement.id,
            charts = results.len(),
            "measurement recorded"
        );
        Ok(RecordedMeasurement {
            measurement,
            results,
        })
    }

    /// Deletes a measurement and invalidates the patient's cached analytics.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the patient or measurement does not exist and `Forbidden` for another
    /// tenant's patient.
    pub fn delete_measurement(
        &self,
        ctx: &AccessContext,
        patient_id: &PatientId,
        measurement_id: Uuid,
    ) -> GrowthResult<()> {
        self.authorised_patient(ctx, patient_id)?;
        self.repository.delete_measurement(patient_id, measurement_id)?;
        self.cache.invalidate(&[patient_tag(patient_id)]);
        tracing::info!(patient_id = %patient_id, %measurement_id, "measurement deleted");
        Ok(())
    }
}
