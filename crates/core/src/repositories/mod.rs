//! Repository seam for patient measurement history.
//!
//! Persistence belongs to the surrounding clinic system. The engine reads patients and
//! measurements through [`GrowthRepository`] and hands computed results back through
//! [`GrowthRepository::persist_growth_result`]; it never owns the storage format.
//!
//! Two implementations ship with the crate:
//! - [`memory::InMemoryRepository`] for tests and embedding
//! - [`file::FileRepository`], YAML files under sharded patient directories

pub mod file;
pub mod memory;

use crate::calculator::ZScoreResult;
use crate::validation::validate_measurement_value;
use crate::{age_days_to_months, GrowthError, GrowthResult};
use chrono::NaiveDate;
use growth_types::{ChartType, Gender, NonEmptyText, PatientId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The subset of a patient record the engine needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientRecord {
    pub id: PatientId,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub tenant_id: NonEmptyText,
}

/// One dated set of anthropometric values. Immutable once stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: Uuid,
    pub patient_id: PatientId,
    pub date: NaiveDate,
    pub age_days: i64,
    pub age_months: f64,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub head_circumference: Option<f64>,
    pub bmi: Option<f64>,
}

impl Measurement {
    /// Builds a measurement snapshot for `patient`, deriving age and BMI.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if no value is present, a value is not positive, or the date
    /// precedes the date of birth.
    pub fn new(patient: &PatientRecord, input: NewMeasurement) -> GrowthResult<Self> {
        if input.weight.is_none() && input.height.is_none() && input.head_circumference.is_none()
        {
            return Err(GrowthError::InvalidInput(
                "a measurement needs at least one of weight, height or head_circumference".into(),
            ));
        }
        let weight = input
            .weight
            .map(|v| validate_measurement_value("weight", v))
            .transpose()?;
        let height = input
            .height
            .map(|v| validate_measurement_value("height", v))
            .transpose()?;
        let head_circumference = input
            .head_circumference
            .map(|v| validate_measurement_value("head_circumference", v))
            .transpose()?;

        let age_days = age_in_days(patient.date_of_birth, input.date)?;
        let bmi = match (weight, height) {
            (Some(w), Some(h)) => Some(w / (h / 100.0).powi(2)),
            _ => None,
        };

        Ok(Self {
            id: Uuid::new_v4(),
            patient_id: patient.id.clone(),
            date: input.date,
            age_days,
            age_months: age_days_to_months(age_days),
            weight,
            height,
            head_circumference,
            bmi,
        })
    }

    /// The raw value plotted on `chart_type`, if this measurement recorded it.
    pub fn value_for(&self, chart_type: ChartType) -> Option<f64> {
        match chart_type {
            ChartType::WeightForAge => self.weight,
            ChartType::HeightForAge => self.height,
            ChartType::HeadCircumferenceForAge => self.head_circumference,
        }
    }
}

/// Values captured at a visit, before the engine derives age.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMeasurement {
    pub date: NaiveDate,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub head_circumference: Option<f64>,
}

/// Inclusive date filter; an open end is unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> GrowthResult<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            crate::validation::validate_date_window(s, e)?;
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// Stable fragment for cache keys.
    pub fn cache_fragment(&self) -> String {
        let fmt = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "*".into());
        format!("{}..{}", fmt(self.start), fmt(self.end))
    }
}

/// Whole days between date of birth and `date`.
pub fn age_in_days(date_of_birth: NaiveDate, date: NaiveDate) -> GrowthResult<i64> {
    let days = (date - date_of_birth).num_days();
    if days < 0 {
        return Err(GrowthError::InvalidInput(format!(
            "measurement date {date} precedes date of birth {date_of_birth}"
        )));
    }
    Ok(days)
}

/// Storage consumed by the growth engine.
///
/// Implementations must return measurements in ascending date order and must store a
/// measurement atomically (all of its values as one snapshot).
pub trait GrowthRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `NotFound` if the patient does not exist.
    fn fetch_patient(&self, patient_id: &PatientId) -> GrowthResult<PatientRecord>;

    fn list_measurements(
        &self,
        patient_id: &PatientId,
        range: Option<&DateRange>,
    ) -> GrowthResult<Vec<Measurement>>;

    fn save_measurement(&self, measurement: &Measurement) -> GrowthResult<()>;

    /// # Errors
    ///
    /// Returns `NotFound` if the measurement does not belong to the patient.
    fn delete_measurement(&self, patient_id: &PatientId, measurement_id: Uuid)
        -> GrowthResult<()>;

    fn persist_growth_result(
        &self,
        measurement: &Measurement,
        chart_type: ChartType,
        result: &ZScoreResult,
    ) -> GrowthResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> PatientRecord {
        PatientRecord {
            id: PatientId::new(),
            date_of_birth: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            gender: Gender::Female,
            tenant_id: NonEmptyText::new("clinic-a").unwrap(),
        }
    }

    #[test]
    fn derives_age_and_bmi() {
        let m = Measurement::new(
            &patient(),
            NewMeasurement {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                weight: Some(5.0),
                height: Some(50.0),
                head_circumference: None,
            },
        )
        .unwrap();
        assert_eq!(m.age_days, 60);
        assert!((m.bmi.unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(m.value_for(ChartType::HeightForAge), Some(50.0));
        assert_eq!(m.value_for(ChartType::HeadCircumferenceForAge), None);
    }

    #[test]
    fn rejects_date_before_birth() {
        let err = Measurement::new(
            &patient(),
            NewMeasurement {
                date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
                weight: Some(3.0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, GrowthError::InvalidInput(_)));
    }

    #[test]
    fn rejects_empty_measurement() {
        let err = Measurement::new(
            &patient(),
            NewMeasurement {
                date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, GrowthError::InvalidInput(_)));
    }

    #[test]
    fn date_range_is_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let range = DateRange::new(Some(d(5)), Some(d(10))).unwrap();
        assert!(range.contains(d(5)));
        assert!(range.contains(d(10)));
        assert!(!range.contains(d(11)));
        assert!(DateRange::default().contains(d(1)));
        assert_eq!(range.cache_fragment(), "2024-01-05..2024-01-10");
    }
}
