//! Clinical classification of Z-scores, per chart type.
//!
//! Each chart has its own bands. Height-for-age is one-sided: there is no "too tall" label.
//!
//! | Chart | Band |
//! |-------|------|
//! | WFA   | `Z < -3` severe-underweight, `-3 <= Z <= -2` underweight, `-2 < Z <= 2` normal, `2 < Z <= 3` overweight, `Z > 3` obese |
//! | HFA   | `Z < -3` severely-stunted, `-3 <= Z <= -2` stunted, `Z > -2` normal |
//! | HcFA  | `Z < -3` severely-microcephalic, `-3 <= Z <= -2` microcephalic, `-2 < Z <= 2` normal, `2 < Z <= 3` macrocephalic, `Z > 3` severely-macrocephalic |
//!
//! A Z-score of exactly -2 is already outside the normal band.

use growth_types::ChartType;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    SevereUnderweight,
    Underweight,
    Normal,
    Overweight,
    Obese,
    SeverelyStunted,
    Stunted,
    SeverelyMicrocephalic,
    Microcephalic,
    Macrocephalic,
    SeverelyMacrocephalic,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::SevereUnderweight => "severe-underweight",
            Classification::Underweight => "underweight",
            Classification::Normal => "normal",
            Classification::Overweight => "overweight",
            Classification::Obese => "obese",
            Classification::SeverelyStunted => "severely-stunted",
            Classification::Stunted => "stunted",
            Classification::SeverelyMicrocephalic => "severely-microcephalic",
            Classification::Microcephalic => "microcephalic",
            Classification::Macrocephalic => "macrocephalic",
            Classification::SeverelyMacrocephalic => "severely-macrocephalic",
        }
    }

    pub fn is_normal(self) -> bool {
        self == Classification::Normal
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a finite Z-score for the given chart.
pub fn classify(chart_type: ChartType, z: f64) -> Classification {
    match chart_type {
        ChartType::WeightForAge => two_sided(
            z,
            [
                Classification::SevereUnderweight,
                Classification::Underweight,
                Classification::Normal,
                Classification::Overweight,
                Classification::Obese,
            ],
        ),
        ChartType::HeightForAge => {
            if z < -3.0 {
                Classification::SeverelyStunted
            } else if z <= -2.0 {
                Classification::Stunted
            } else {
                Classification::Normal
            }
        }
        ChartType::HeadCircumferenceForAge => two_sided(
            z,
            [
                Classification::SeverelyMicrocephalic,
                Classification::Microcephalic,
                Classification::Normal,
                Classification::Macrocephalic,
                Classification::SeverelyMacrocephalic,
            ],
        ),
    }
}

fn two_sided(z: f64, bands: [Classification; 5]) -> Classification {
    if z < -3.0 {
        bands[0]
    } else if z <= -2.0 {
        bands[1]
    } else if z <= 2.0 {
        bands[2]
    } else if z <= 3.0 {
        bands[3]
    } else {
        bands[4]
    }
}
