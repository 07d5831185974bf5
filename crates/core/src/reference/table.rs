use super::{wire, ReferencePoint, ReferenceStore};
use crate::constants::BUNDLED_REFERENCE_YAML;
use crate::{GrowthError, GrowthResult};
use growth_types::{ChartType, Gender};
use std::collections::BTreeMap;
use std::path::Path;

/// In-memory reference table, rows grouped by (gender, chart) and sorted by age.
#[derive(Clone, Debug)]
pub struct ReferenceTable {
    source: String,
    rows: BTreeMap<(Gender, ChartType), Vec<ReferencePoint>>,
}

impl ReferenceTable {
    /// Builds a table from already-validated rows.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceData` if two rows share the same (gender, chart, age) key.
    pub fn from_points(
        source: impl Into<String>,
        points: impl IntoIterator<Item = ReferencePoint>,
    ) -> GrowthResult<Self> {
        let mut rows: BTreeMap<(Gender, ChartType), Vec<ReferencePoint>> = BTreeMap::new();
        for point in points {
            rows.entry((point.gender, point.chart_type))
                .or_default()
                .push(point);
        }

        for ((gender, chart_type), series) in rows.iter_mut() {
            series.sort_by_key(|p| p.age_days);
            if let Some(dup) = series.windows(2).find(|w| w[0].age_days == w[1].age_days) {
                return Err(GrowthError::ReferenceData(format!(
                    "duplicate reference row for {gender} {chart_type} at age_days {}",
                    dup[0].age_days
                )));
            }
        }

        Ok(Self {
            source: source.into(),
            rows,
        })
    }

    /// Parses a YAML reference table.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceData` if the YAML does not match the schema, a row has invalid LMS
    /// parameters, or keys are duplicated.
    pub fn from_yaml_str(yaml_text: &str) -> GrowthResult<Self> {
        let table = wire::parse(yaml_text)?;
        let points = table
            .rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| wire::row_to_domain(index, row))
            .collect::<GrowthResult<Vec<_>>>()?;
        Self::from_points(table.source, points)
    }

    /// Loads a YAML reference table from disk.
    pub fn load(path: &Path) -> GrowthResult<Self> {
        let text = std::fs::read_to_string(path).map_err(GrowthError::FileRead)?;
        let table = Self::from_yaml_str(&text)?;
        tracing::info!(
            path = %path.display(),
            source = %table.source,
            rows = table.len(),
            "loaded reference table"
        );
        Ok(table)
    }

    /// The WHO excerpt compiled into the crate.
    pub fn bundled() -> GrowthResult<Self> {
        Self::from_yaml_str(BUNDLED_REFERENCE_YAML)
    }

    /// Loads `path` if given, otherwise the bundled table.
    pub fn load_or_bundled(path: Option<&Path>) -> GrowthResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }

    /// Total number of rows across all series.
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ReferenceStore for ReferenceTable {
    fn rows(&self, gender: Gender, chart_type: ChartType) -> &[ReferencePoint] {
        self.rows
            .get(&(gender, chart_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lms::LmsParams;

    fn point(age_days: u32, m: f64) -> ReferencePoint {
        ReferencePoint::from_lms(
            Gender::Male,
            ChartType::WeightForAge,
            age_days,
            LmsParams::new(1.0, m, 0.15).unwrap(),
        )
        .unwrap()
    }

    fn table() -> ReferenceTable {
        ReferenceTable::from_points("test", [point(30, 4.0), point(0, 3.3), point(60, 5.0)])
            .unwrap()
    }

    #[test]
    fn exact_age_returns_single_row() {
        let bracket = table()
            .lookup(Gender::Male, ChartType::WeightForAge, 30)
            .unwrap();
        assert!(bracket.is_exact());
        assert!(!bracket.clamped);
        assert_eq!(bracket.lower.lms.m, 4.0);
    }

    #[test]
    fn between_rows_returns_neighbours() {
        let bracket = table()
            .lookup(Gender::Male, ChartType::WeightForAge, 45)
            .unwrap();
        assert_eq!(bracket.lower.age_days, 30);
        assert_eq!(bracket.upper.age_days, 60);
    }

    #[test]
    fn beyond_last_row_clamps() {
        let bracket = table()
            .lookup(Gender::Male, ChartType::WeightForAge, 400)
            .unwrap();
        assert!(bracket.clamped);
        assert_eq!(bracket.lower.age_days, 60);
        assert_eq!(bracket.upper.age_days, 60);
    }

    #[test]
    fn missing_series_is_not_found() {
        let err = table()
            .lookup(Gender::Female, ChartType::WeightForAge, 10)
            .unwrap_err();
        assert!(matches!(err, GrowthError::NotFound(_)));
    }

    #[test]
    fn rejects_duplicate_rows() {
        let err = ReferenceTable::from_points("dup", [point(0, 3.3), point(0, 3.4)]).unwrap_err();
        assert!(matches!(err, GrowthError::ReferenceData(_)));
    }

    #[test]
    fn bundled_table_covers_every_series() {
        let table = ReferenceTable::bundled().unwrap();
        for gender in [Gender::Male, Gender::Female] {
            for chart in ChartType::ALL {
                assert!(!table.rows(gender, chart).is_empty(), "{gender} {chart}");
            }
        }
    }

    #[test]
    fn yaml_reports_failing_path() {
        let yaml = r#"source: test
rows:
  - { gender: MALE, chart_type: WFA, age_days: 0, l: 1, m: 3.3, s: "wide" }
"#;
        let err = ReferenceTable::from_yaml_str(yaml).unwrap_err();
        match err {
            GrowthError::ReferenceData(msg) => assert!(msg.contains("rows[0].s"), "{msg}"),
            other => panic!("expected ReferenceData error, got {other:?}"),
        }
    }

    #[test]
    fn yaml_rejects_unknown_columns() {
        let yaml = r#"source: test
rows:
  - { gender: MALE, chart_type: WFA, age_days: 0, l: 1, m: 3.3, s: 0.1, p50: 3.3 }
"#;
        assert!(ReferenceTable::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn yaml_rejects_zero_s() {
        let yaml = r#"source: test
rows:
  - { gender: FEMALE, chart_type: HcFA, age_days: 0, l: 1, m: 33.9, s: 0 }
"#;
        let err = ReferenceTable::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, GrowthError::ReferenceData(_)));
    }
}
