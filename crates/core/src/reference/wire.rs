//! On-disk YAML wire model for reference tables.
//!
//! The wire model is strict (`deny_unknown_fields`) so that a typo in a hand-edited table fails
//! loudly instead of silently dropping a column.

use super::{ReferencePoint, SdLines};
use crate::lms::LmsParams;
use crate::{GrowthError, GrowthResult};
use growth_types::{ChartType, Gender};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ReferenceTableWire {
    pub source: String,
    pub rows: Vec<ReferenceRowWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ReferenceRowWire {
    pub gender: Gender,
    pub chart_type: ChartType,
    pub age_days: u32,
    #[serde(default)]
    pub age_months: Option<f64>,
    pub l: f64,
    pub m: f64,
    pub s: f64,
    #[serde(default)]
    pub sd: Option<SdLinesWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct SdLinesWire {
    pub sd4neg: f64,
    pub sd3neg: f64,
    pub sd2neg: f64,
    pub sd1neg: f64,
    pub sd1pos: f64,
    pub sd2pos: f64,
    pub sd3pos: f64,
    pub sd4pos: f64,
}

/// Parses YAML text into the wire model.
///
/// This uses `serde_path_to_error` to surface the failing path (e.g. `rows[12].s`).
pub(super) fn parse(yaml_text: &str) -> GrowthResult<ReferenceTableWire> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
    serde_path_to_error::deserialize::<_, ReferenceTableWire>(deserializer).map_err(|err| {
        let path = err.path().to_string();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        GrowthError::ReferenceData(format!(
            "reference table schema mismatch at {path}: {}",
            err.into_inner()
        ))
    })
}

/// Converts one wire row into a validated domain row.
pub(super) fn row_to_domain(index: usize, row: ReferenceRowWire) -> GrowthResult<ReferencePoint> {
    let invalid = |msg: String| GrowthError::ReferenceData(format!("rows[{index}]: {msg}"));

    let lms = LmsParams::new(row.l, row.m, row.s).map_err(|e| invalid(e.to_string()))?;

    let mut point = ReferencePoint::from_lms(row.gender, row.chart_type, row.age_days, lms)
        .map_err(|e| invalid(e.to_string()))?;

    if let Some(age_months) = row.age_months {
        if !age_months.is_finite() || age_months < 0.0 {
            return Err(invalid(format!("age_months must be non-negative, got {age_months}")));
        }
        point.age_months = age_months;
    }

    if let Some(sd) = row.sd {
        let lines = SdLines {
            sd4neg: sd.sd4neg,
            sd3neg: sd.sd3neg,
            sd2neg: sd.sd2neg,
            sd1neg: sd.sd1neg,
            sd1pos: sd.sd1pos,
            sd2pos: sd.sd2pos,
            sd3pos: sd.sd3pos,
            sd4pos: sd.sd4pos,
        };
        let ordered = [
            lines.sd4neg,
            lines.sd3neg,
            lines.sd2neg,
            lines.sd1neg,
            lms.m,
            lines.sd1pos,
            lines.sd2pos,
            lines.sd3pos,
            lines.sd4pos,
        ];
        if ordered.iter().any(|v| !v.is_finite() || *v <= 0.0)
            || ordered.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(invalid("SD lines must be positive and strictly increasing".into()));
        }
        point.sd = lines;
    }

    Ok(point)
}
