//! # Growth Types
//!
//! Validated primitives shared by the growth engine and its API surfaces.
//!
//! Once constructed, each type guarantees its invariant, so downstream code never re-checks:
//! - [`NonEmptyText`]: trimmed, non-empty text (tenant ids, labels)
//! - [`PatientId`]: canonical 32-hex UUID with sharded directory derivation
//! - [`Gender`] and [`ChartType`]: the closed sets the WHO reference tables are keyed by

mod chart;
mod patient_id;

pub use chart::{ChartType, Gender};
pub use patient_id::PatientId;

/// Errors that can occur when creating validated types.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The identifier is not a canonical 32-character lowercase hex UUID
    #[error("invalid patient id: '{0}'")]
    InvalidPatientId(String),
    /// The gender is not one of the supported values
    #[error("unknown gender: '{0}'")]
    UnknownGender(String),
    /// The chart type is not one of WFA, HFA or HcFA
    #[error("unknown chart type: '{0}'")]
    UnknownChartType(String),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_input() {
        let text = NonEmptyText::new("  tenant-a ").unwrap();
        assert_eq!(text.as_str(), "tenant-a");
    }

    #[test]
    fn rejects_whitespace_only() {
        assert!(matches!(NonEmptyText::new("   "), Err(TypeError::Empty)));
    }

    #[test]
    fn deserialise_rejects_empty_string() {
        let err = serde_json::from_str::<NonEmptyText>("\"  \"").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
