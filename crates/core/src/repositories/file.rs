//! File-backed repository.
//!
//! Layout, per patient: `<patient_data_dir>/<s1>/<s2>/<patient_id>/`
//! - `patient.yaml`: id, date of birth, gender, tenant
//! - `measurements.yaml`: measurement history with any persisted growth results
//!
//! Measurement values written by other systems may be YAML numbers or decimal strings such as
//! `"12.40"`. They are normalised to `f64` here, once, so the numeric core only ever sees floats.

use super::{age_in_days, DateRange, GrowthRepository, Measurement, PatientRecord};
use crate::calculator::{ReferenceValues, ZScoreResult};
use crate::classification::Classification;
use crate::constants::{MEASUREMENTS_YAML_FILENAME, PATIENT_YAML_FILENAME};
use crate::{age_days_to_months, GrowthError, GrowthResult};
use chrono::NaiveDate;
use growth_types::{ChartType, Gender, NonEmptyText, PatientId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

#[derive(Debug)]
pub struct FileRepository {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRepository {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn patient_dir(&self, patient_id: &PatientId) -> PathBuf {
        patient_id.sharded_dir(&self.base_dir)
    }

    /// Writes a new patient stub.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the patient already exists, or an I/O error variant if the
    /// directory or file cannot be written.
    pub fn create_patient(&self, patient: &PatientRecord) -> GrowthResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let dir = self.patient_dir(&patient.id);
        let path = dir.join(PATIENT_YAML_FILENAME);
        if path.exists() {
            return Err(GrowthError::InvalidInput(format!(
                "patient {} already exists",
                patient.id
            )));
        }
        fs::create_dir_all(&dir).map_err(GrowthError::StorageDirCreation)?;

        let wire = PatientWire {
            id: patient.id.to_string(),
            date_of_birth: patient.date_of_birth,
            gender: patient.gender,
            tenant_id: patient.tenant_id.to_string(),
        };
        let yaml = serde_yaml::to_string(&wire).map_err(GrowthError::YamlSerialization)?;
        fs::write(&path, yaml).map_err(GrowthError::FileWrite)
    }

    fn read_measurements(&self, patient_id: &PatientId) -> GrowthResult<MeasurementsWire> {
        let path = self.patient_dir(patient_id).join(MEASUREMENTS_YAML_FILENAME);
        if !path.is_file() {
            return Ok(MeasurementsWire::default());
        }
        let text = fs::read_to_string(&path).map_err(GrowthError::FileRead)?;
        let deserializer = serde_yaml::Deserializer::from_str(&text);
        serde_path_to_error::deserialize(deserializer).map_err(|err| {
            GrowthError::InvalidInput(format!(
                "{} is malformed at {}: {}",
                path.display(),
                err.path(),
                err.inner()
            ))
        })
    }

    fn write_measurements(
        &self,
        patient_id: &PatientId,
        wire: &MeasurementsWire,
    ) -> GrowthResult<()> {
        let path = self.patient_dir(patient_id).join(MEASUREMENTS_YAML_FILENAME);
        let yaml = serde_yaml::to_string(wire).map_err(GrowthError::YamlSerialization)?;
        fs::write(path, yaml).map_err(GrowthError::FileWrite)
    }
}

impl GrowthRepository for FileRepository {
    fn fetch_patient(&self, patient_id: &PatientId) -> GrowthResult<PatientRecord> {
        let path = self.patient_dir(patient_id).join(PATIENT_YAML_FILENAME);
        if !path.is_file() {
            return Err(GrowthError::NotFound(format!("patient {patient_id}")));
        }
        let text = fs::read_to_string(&path).map_err(GrowthError::FileRead)?;
        let wire: PatientWire =
            serde_yaml::from_str(&text).map_err(GrowthError::YamlDeserialization)?;

        let id = PatientId::parse(&wire.id)?;
        if &id != patient_id {
            return Err(GrowthError::InvalidInput(format!(
                "{} holds patient {id}, expected {patient_id}",
                path.display()
            )));
        }
        Ok(PatientRecord {
            id,
            date_of_birth: wire.date_of_birth,
            gender: wire.gender,
            tenant_id: NonEmptyText::new(&wire.tenant_id)?,
        })
    }

    fn list_measurements(
        &self,
        patient_id: &PatientId,
        range: Option<&DateRange>,
    ) -> GrowthResult<Vec<Measurement>> {
        let patient = self.fetch_patient(patient_id)?;
        let wire = self.read_measurements(patient_id)?;

        let mut measurements = wire
            .measurements
            .into_iter()
            .filter(|m| range.map_or(true, |r| r.contains(m.date)))
            .map(|m| m.into_domain(&patient))
            .collect::<GrowthResult<Vec<_>>>()?;
        measurements.sort_by_key(|m| m.date);
        Ok(measurements)
    }

    fn save_measurement(&self, measurement: &Measurement) -> GrowthResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut wire = self.read_measurements(&measurement.patient_id)?;
        wire.measurements.retain(|m| m.id != measurement.id);
        wire.measurements.push(MeasurementWire::from_domain(measurement));
        wire.measurements.sort_by_key(|m| m.date);
        self.write_measurements(&measurement.patient_id, &wire)
    }

    fn delete_measurement(&self, patient_id: &PatientId, measurement_id: Uuid) -> GrowthResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut wire = self.read_measurements(patient_id)?;
        let before = wire.measurements.len();
        wire.measurements.retain(|m| m.id != measurement_id);
        if wire.measurements.len() == before {
            return Err(GrowthError::NotFound(format!("measurement {measurement_id}")));
        }
        self.write_measurements(patient_id, &wire)
    }

    fn persist_growth_result(
        &self,
        measurement: &Measurement,
        chart_type: ChartType,
        result: &ZScoreResult,
    ) -> GrowthResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut wire = self.read_measurements(&measurement.patient_id)?;
        let stored = wire
            .measurements
            .iter_mut()
            .find(|m| m.id == measurement.id)
            .ok_or_else(|| GrowthError::NotFound(format!("measurement {}", measurement.id)))?;
        stored.results.insert(chart_type, StoredResultWire::from(result));
        self.write_measurements(&measurement.patient_id, &wire)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatientWire {
    id: String,
    date_of_birth: NaiveDate,
    gender: Gender,
    tenant_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MeasurementsWire {
    #[serde(default)]
    measurements: Vec<MeasurementWire>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MeasurementWire {
    id: Uuid,
    date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    age_days: Option<i64>,
    #[serde(default, deserialize_with = "decimal::optional", skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
    #[serde(default, deserialize_with = "decimal::optional", skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
    #[serde(default, deserialize_with = "decimal::optional", skip_serializing_if = "Option::is_none")]
    head_circumference: Option<f64>,
    #[serde(default, deserialize_with = "decimal::optional", skip_serializing_if = "Option::is_none")]
    bmi: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    results: BTreeMap<ChartType, StoredResultWire>,
}

impl MeasurementWire {
    fn from_domain(m: &Measurement) -> Self {
        Self {
            id: m.id,
            date: m.date,
            age_days: Some(m.age_days),
            weight: m.weight,
            height: m.height,
            head_circumference: m.head_circumference,
            bmi: m.bmi,
            results: BTreeMap::new(),
        }
    }

    fn into_domain(self, patient: &PatientRecord) -> GrowthResult<Measurement> {
        let age_days = match self.age_days {
            Some(days) if days < 0 => {
                return Err(GrowthError::InvalidInput(format!(
                    "measurement {} has negative age_days {days}",
                    self.id
                )))
            }
            Some(days) => days,
            None => age_in_days(patient.date_of_birth, self.date)?,
        };
        Ok(Measurement {
            id: self.id,
            patient_id: patient.id.clone(),
            date: self.date,
            age_days,
            age_months: age_days_to_months(age_days),
            weight: self.weight,
            height: self.height,
            head_circumference: self.head_circumference,
            bmi: self.bmi,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredResultWire {
    z_score: f64,
    percentile: f64,
    classification: Classification,
    median: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sd2neg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sd2pos: Option<f64>,
}

impl From<&ZScoreResult> for StoredResultWire {
    fn from(result: &ZScoreResult) -> Self {
        let ReferenceValues {
            median,
            sd2neg,
            sd2pos,
        } = result.reference_values;
        Self {
            z_score: result.z_score,
            percentile: result.percentile,
            classification: result.classification,
            median,
            sd2neg,
            sd2pos,
        }
    }
}

mod decimal {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DecimalWire {
        Number(f64),
        Text(String),
    }

    /// Accepts a number, a decimal string, or null.
    pub(super) fn optional<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<DecimalWire>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let value = match raw {
            DecimalWire::Number(n) => n,
            DecimalWire::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("invalid decimal '{text}'")))?,
        };
        if !value.is_finite() {
            return Err(D::Error::custom("decimal must be finite"));
        }
        Ok(Some(value))
    }
}
