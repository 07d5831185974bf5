//! Wire types for the HTTP surface.
//!
//! Requests deserialise straight from JSON or query strings. Responses are built from the core
//! domain types via `From`, so handlers stay thin.

use chrono::NaiveDate;
use growth_core::analytics::{
    GrowthComparison, GrowthProjection, GrowthTrends, ProjectedPoint, TrendPoint, TrendSummary,
    Velocity,
};
use growth_core::repositories::NewMeasurement;
use growth_core::service::{ChartPoint, GrowthChart, RecordedMeasurement};
use growth_core::ZScoreResult;
use growth_types::{ChartType, Gender};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
    pub reference_source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// One of `not_found`, `forbidden`, `invalid_input`, `unauthorised`, `internal`.
    pub error: String,
    pub message: String,
}

// ============================================================================
// Z-score
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ZScoreReq {
    pub gender: Gender,
    pub chart_type: ChartType,
    pub age_days: i64,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReferenceValuesRes {
    pub median: f64,
    /// Absent when the reference places no measurement at -2 SD for this age.
    pub sd2neg: Option<f64>,
    /// Absent when the reference places no measurement at +2 SD for this age.
    pub sd2pos: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ZScoreRes {
    pub z_score: f64,
    pub percentile: f64,
    pub classification: String,
    pub reference_values: ReferenceValuesRes,
}

impl From<ZScoreResult> for ZScoreRes {
    fn from(result: ZScoreResult) -> Self {
        Self {
            z_score: result.z_score,
            percentile: result.percentile,
            classification: result.classification.to_string(),
            reference_values: ReferenceValuesRes {
                median: result.reference_values.median,
                sd2neg: result.reference_values.sd2neg,
                sd2pos: result.reference_values.sd2pos,
            },
        }
    }
}

// ============================================================================
// Reference charts
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartPointRes {
    pub age_days: u32,
    pub age_months: f64,
    pub sd3neg: f64,
    pub sd2neg: f64,
    pub median: f64,
    pub sd2pos: f64,
    pub sd3pos: f64,
}

impl From<ChartPoint> for ChartPointRes {
    fn from(p: ChartPoint) -> Self {
        Self {
            age_days: p.age_days,
            age_months: p.age_months,
            sd3neg: p.sd3neg,
            sd2neg: p.sd2neg,
            median: p.median,
            sd2pos: p.sd2pos,
            sd3pos: p.sd3pos,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartRes {
    pub gender: Gender,
    pub chart_type: ChartType,
    pub unit: String,
    pub source: String,
    pub points: Vec<ChartPointRes>,
}

impl From<GrowthChart> for ChartRes {
    fn from(chart: GrowthChart) -> Self {
        Self {
            gender: chart.gender,
            chart_type: chart.chart_type,
            unit: chart.unit,
            source: chart.source,
            points: chart.points.into_iter().map(ChartPointRes::from).collect(),
        }
    }
}

// ============================================================================
// Measurements
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordMeasurementReq {
    pub date: NaiveDate,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub head_circumference: Option<f64>,
}

impl From<RecordMeasurementReq> for NewMeasurement {
    fn from(req: RecordMeasurementReq) -> Self {
        Self {
            date: req.date,
            weight: req.weight,
            height: req.height,
            head_circumference: req.head_circumference,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartResultRes {
    pub chart_type: ChartType,
    pub result: ZScoreRes,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordMeasurementRes {
    pub id: Uuid,
    pub date: NaiveDate,
    pub age_days: i64,
    pub age_months: f64,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub head_circumference: Option<f64>,
    pub bmi: Option<f64>,
    pub results: Vec<ChartResultRes>,
}

impl From<RecordedMeasurement> for RecordMeasurementRes {
    fn from(recorded: RecordedMeasurement) -> Self {
        let m = recorded.measurement;
        Self {
            id: m.id,
            date: m.date,
            age_days: m.age_days,
            age_months: m.age_months,
            weight: m.weight,
            height: m.height,
            head_circumference: m.head_circumference,
            bmi: m.bmi,
            results: recorded
                .results
                .into_iter()
                .map(|(chart_type, result)| ChartResultRes {
                    chart_type,
                    result: result.into(),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Trends and velocity
// ============================================================================

#[derive(Clone, Debug, PartialEq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrendsQuery {
    /// Inclusive start date (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Inclusive end date (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VelocityQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VelocityRes {
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

impl From<Velocity> for VelocityRes {
    fn from(v: Velocity) -> Self {
        Self {
            start_date: v.start_date,
            end_date: v.end_date,
            start_value: v.start_value,
            end_value: v.end_value,
            delta_value: v.delta_value,
            delta_days: v.delta_days,
            per_day: v.per_day,
            per_month: v.per_month,
            per_year: v.per_year,
            unit: v.unit,
        }
    }
}

/// `velocity` is null when fewer than two measurements qualify.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VelocityEnvelopeRes {
    pub velocity: Option<VelocityRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendPointRes {
    pub date: NaiveDate,
    pub age_months: f64,
    pub value: f64,
    pub z_score: f64,
    pub percentile: f64,
    pub classification: String,
}

impl From<TrendPoint> for TrendPointRes {
    fn from(p: TrendPoint) -> Self {
        Self {
            date: p.date,
            age_months: p.age_months,
            value: p.value,
            z_score: p.z_score,
            percentile: p.percentile,
            classification: p.classification.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendSummaryRes {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub measurement_count: usize,
    pub current_value: f64,
    pub current_z_score: f64,
    pub current_percentile: f64,
    pub current_classification: String,
}

impl From<TrendSummary> for TrendSummaryRes {
    fn from(s: TrendSummary) -> Self {
        Self {
            first_date: s.first_date,
            last_date: s.last_date,
            measurement_count: s.measurement_count,
            current_value: s.current_value,
            current_z_score: s.current_z_score,
            current_percentile: s.current_percentile,
            current_classification: s.current_classification.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendsRes {
    pub chart_type: ChartType,
    pub unit: String,
    pub trends: Vec<TrendPointRes>,
    pub velocity: Option<VelocityRes>,
    pub summary: Option<TrendSummaryRes>,
}

impl From<GrowthTrends> for TrendsRes {
    fn from(t: GrowthTrends) -> Self {
        Self {
            chart_type: t.chart_type,
            unit: t.unit,
            trends: t.trends.into_iter().map(TrendPointRes::from).collect(),
            velocity: t.velocity.map(VelocityRes::from),
            summary: t.summary.map(TrendSummaryRes::from),
        }
    }
}

// ============================================================================
// Projection
// ============================================================================

#[derive(Clone, Debug, PartialEq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectionQuery {
    /// Months ahead to project, 1 to 60. Defaults to 12.
    pub horizon_months: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectedPointRes {
    pub months_ahead: u32,
    pub date: NaiveDate,
    pub age_months: f64,
    pub value: f64,
    pub z_score: Option<f64>,
    pub percentile: Option<f64>,
    pub confidence: f64,
}

impl From<ProjectedPoint> for ProjectedPointRes {
    fn from(p: ProjectedPoint) -> Self {
        Self {
            months_ahead: p.months_ahead,
            date: p.date,
            age_months: p.age_months,
            value: p.value,
            z_score: p.z_score,
            percentile: p.percentile,
            confidence: p.confidence,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectionRes {
    pub chart_type: ChartType,
    pub base_date: NaiveDate,
    pub base_value: f64,
    pub average_monthly_growth: f64,
    pub intervals_used: usize,
    /// Heuristic decay, not a validated clinical interval.
    pub confidence: f64,
    pub projections: Vec<ProjectedPointRes>,
}

impl From<GrowthProjection> for ProjectionRes {
    fn from(p: GrowthProjection) -> Self {
        Self {
            chart_type: p.chart_type,
            base_date: p.base_date,
            base_value: p.base_value,
            average_monthly_growth: p.average_monthly_growth,
            intervals_used: p.intervals_used,
            confidence: p.confidence,
            projections: p.projections.into_iter().map(ProjectedPointRes::from).collect(),
        }
    }
}

/// `projection` is null when fewer than two measurements carry a value for the chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectionEnvelopeRes {
    pub projection: Option<ProjectionRes>,
}

// ============================================================================
// Comparison
// ============================================================================

#[derive(Clone, Debug, PartialEq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompareQuery {
    /// `age`, `percentile` or `velocity`.
    pub mode: String,
    /// Chart code (`WFA`, `HFA`, `HcFA`). Defaults to `WFA`.
    pub chart_type: Option<String>,
    pub reference_age_months: Option<f64>,
    pub window_days: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompareRes {
    pub mode: String,
    pub comparison: String,
    /// `no_data` when the patient has no usable measurement.
    pub status: String,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

impl From<GrowthComparison> for CompareRes {
    fn from(c: GrowthComparison) -> Self {
        Self {
            mode: c.mode.to_string(),
            comparison: c.comparison,
            status: c.status,
            details: c.details,
        }
    }
}
