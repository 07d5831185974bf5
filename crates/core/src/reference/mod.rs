//! WHO reference data: immutable LMS rows keyed by gender, chart type and age.
//!
//! Rows are loaded once at startup (see [`ReferenceTable`]) and never mutated afterwards, which is
//! what makes every lookup safe to memoise without invalidation.

mod table;
mod wire;

pub use table::ReferenceTable;

use crate::lms::{value_at_z, LmsParams};
use crate::{GrowthError, GrowthResult};
use growth_types::{ChartType, Gender};
use serde::{Deserialize, Serialize};

/// Measurement values at whole standard deviations from the median.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SdLines {
    pub sd4neg: f64,
    pub sd3neg: f64,
    pub sd2neg: f64,
    pub sd1neg: f64,
    pub sd1pos: f64,
    pub sd2pos: f64,
    pub sd3pos: f64,
    pub sd4pos: f64,
}

impl SdLines {
    /// Derives SD lines from LMS parameters using the inverse transform.
    pub fn from_lms(params: &LmsParams) -> GrowthResult<Self> {
        Ok(Self {
            sd4neg: value_at_z(-4.0, params)?,
            sd3neg: value_at_z(-3.0, params)?,
            sd2neg: value_at_z(-2.0, params)?,
            sd1neg: value_at_z(-1.0, params)?,
            sd1pos: value_at_z(1.0, params)?,
            sd2pos: value_at_z(2.0, params)?,
            sd3pos: value_at_z(3.0, params)?,
            sd4pos: value_at_z(4.0, params)?,
        })
    }
}

/// One row of a WHO LMS table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub gender: Gender,
    pub chart_type: ChartType,
    pub age_days: u32,
    pub age_months: f64,
    pub lms: LmsParams,
    pub sd: SdLines,
}

impl ReferencePoint {
    /// Builds a row from LMS parameters, deriving `age_months` and the SD lines.
    pub fn from_lms(
        gender: Gender,
        chart_type: ChartType,
        age_days: u32,
        lms: LmsParams,
    ) -> GrowthResult<Self> {
        lms.validate()?;
        Ok(Self {
            gender,
            chart_type,
            age_days,
            age_months: crate::age_days_to_months(i64::from(age_days)),
            sd: SdLines::from_lms(&lms)?,
            lms,
        })
    }
}

/// The nearest rows at or below (`lower`) and at or above (`upper`) a requested age.
///
/// `lower == upper` when the age matches a row exactly or when it was clamped to a boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReferenceBracket {
    pub lower: ReferencePoint,
    pub upper: ReferencePoint,
    /// True when the requested age fell outside the table and was clamped to a boundary row.
    pub clamped: bool,
}

impl ReferenceBracket {
    pub fn is_exact(&self) -> bool {
        self.lower.age_days == self.upper.age_days
    }
}

/// Read-only lookup of reference rows.
pub trait ReferenceStore: Send + Sync {
    /// All rows for a (gender, chart) pair, ascending by age. Empty if the pair is absent.
    fn rows(&self, gender: Gender, chart_type: ChartType) -> &[ReferencePoint];

    /// Human-readable provenance of the loaded table.
    fn source(&self) -> &str;

    /// Finds the rows bracketing `age_days`, clamping to the first/last row outside the table.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no rows exist for the (gender, chart) pair.
    fn lookup(
        &self,
        gender: Gender,
        chart_type: ChartType,
        age_days: u32,
    ) -> GrowthResult<ReferenceBracket> {
        let rows = self.rows(gender, chart_type);
        let (first, last) = match (rows.first(), rows.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(GrowthError::NotFound(format!(
                    "no reference data for {gender} {chart_type}"
                )))
            }
        };

        let idx = rows.partition_point(|row| row.age_days < age_days);
        let bracket = if idx == rows.len() {
            ReferenceBracket {
                lower: last,
                upper: last,
                clamped: age_days > last.age_days,
            }
        } else if rows[idx].age_days == age_days {
            ReferenceBracket {
                lower: rows[idx],
                upper: rows[idx],
                clamped: false,
            }
        } else if idx == 0 {
            ReferenceBracket {
                lower: first,
                upper: first,
                clamped: true,
            }
        } else {
            ReferenceBracket {
                lower: rows[idx - 1],
                upper: rows[idx],
                clamped: false,
            }
        };

        if bracket.clamped {
            tracing::debug!(
                %gender,
                %chart_type,
                age_days,
                boundary = bracket.lower.age_days,
                "age outside reference table, clamped to boundary row"
            );
        }
        Ok(bracket)
    }
}
