//! Reference-table keys: gender and growth chart type.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Gender as used by the WHO growth standards (tables are published per sex).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = TypeError;

    /// Accepts `MALE`/`FEMALE` case-insensitively, plus the single-letter forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(TypeError::UnknownGender(s.to_string())),
        }
    }
}

/// Growth chart type. Only the three for-age charts are supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ChartType {
    /// Weight-for-age (kg).
    #[serde(rename = "WFA")]
    WeightForAge,
    /// Height/length-for-age (cm).
    #[serde(rename = "HFA")]
    HeightForAge,
    /// Head-circumference-for-age (cm).
    #[serde(rename = "HcFA")]
    HeadCircumferenceForAge,
}

impl ChartType {
    pub const ALL: [ChartType; 3] = [
        ChartType::WeightForAge,
        ChartType::HeightForAge,
        ChartType::HeadCircumferenceForAge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::WeightForAge => "WFA",
            ChartType::HeightForAge => "HFA",
            ChartType::HeadCircumferenceForAge => "HcFA",
        }
    }

    /// Unit of the raw measurement plotted on this chart.
    pub fn unit(self) -> &'static str {
        match self {
            ChartType::WeightForAge => "kg",
            ChartType::HeightForAge | ChartType::HeadCircumferenceForAge => "cm",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wfa" | "weight" | "weight-for-age" => Ok(ChartType::WeightForAge),
            "hfa" | "lfa" | "height" | "height-for-age" => Ok(ChartType::HeightForAge),
            "hcfa" | "head" | "head-circumference-for-age" => {
                Ok(ChartType::HeadCircumferenceForAge)
            }
            _ => Err(TypeError::UnknownChartType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_type_serialises_with_who_abbreviations() {
        let s = serde_json::to_string(&ChartType::HeadCircumferenceForAge).unwrap();
        assert_eq!(s, "\"HcFA\"");
    }

    #[test]
    fn gender_serialises_uppercase() {
        let s = serde_json::to_string(&Gender::Female).unwrap();
        assert_eq!(s, "\"FEMALE\"");
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("hcfa".parse::<ChartType>().unwrap(), ChartType::HeadCircumferenceForAge);
        assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
    }

    #[test]
    fn rejects_unknown_chart_type() {
        let err = "bmi".parse::<ChartType>().unwrap_err();
        assert!(matches!(err, TypeError::UnknownChartType(_)));
    }
}
