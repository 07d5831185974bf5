//! In-memory repository.

use super::{DateRange, GrowthRepository, Measurement, PatientRecord};
use crate::calculator::ZScoreResult;
use crate::{GrowthError, GrowthResult};
use growth_types::{ChartType, PatientId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    patients: RwLock<HashMap<PatientId, PatientRecord>>,
    measurements: RwLock<HashMap<PatientId, Vec<Measurement>>>,
    results: RwLock<HashMap<(Uuid, ChartType), ZScoreResult>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_patient(&self, patient: PatientRecord) {
        self.patients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(patient.id.clone(), patient);
    }

    /// Stores a pre-built measurement as-is (no age derivation), e.g. imported history.
    pub fn insert_measurement(&self, measurement: Measurement) {
        let mut all = self
            .measurements
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let series = all.entry(measurement.patient_id.clone()).or_default();
        series.push(measurement);
        series.sort_by_key(|m| m.date);
    }

    pub fn growth_result(&self, measurement_id: Uuid, chart_type: ChartType) -> Option<ZScoreResult> {
        self.results
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(measurement_id, chart_type))
            .copied()
    }
}

impl GrowthRepository for InMemoryRepository {
    fn fetch_patient(&self, patient_id: &PatientId) -> GrowthResult<PatientRecord> {
        self.patients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(patient_id)
            .cloned()
            .ok_or_else(|| GrowthError::NotFound(format!("patient {patient_id}")))
    }

    fn list_measurements(
        &self,
        patient_id: &PatientId,
        range: Option<&DateRange>,
    ) -> GrowthResult<Vec<Measurement>> {
        let all = self
            .measurements
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(all
            .get(patient_id)
            .map(|series| {
                series
                    .iter()
                    .filter(|m| range.map_or(true, |r| r.contains(m.date)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn save_measurement(&self, measurement: &Measurement) -> GrowthResult<()> {
        self.insert_measurement(measurement.clone());
        Ok(())
    }

    fn delete_measurement(&self, patient_id: &PatientId, measurement_id: Uuid) -> GrowthResult<()> {
        let mut all = self
            .measurements
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let series = all.get_mut(patient_id).ok_or_else(|| {
            GrowthError::NotFound(format!("measurement {measurement_id}"))
        })?;
        let before = series.len();
        series.retain(|m| m.id != measurement_id);
        if series.len() == before {
            return Err(GrowthError::NotFound(format!("measurement {measurement_id}")));
        }
        self.results
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _), _| *id != measurement_id);
        Ok(())
    }

    fn persist_growth_result(
        &self,
        measurement: &Measurement,
        chart_type: ChartType,
        result: &ZScoreResult,
    ) -> GrowthResult<()> {
        self.results
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((measurement.id, chart_type), *result);
        Ok(())
    }
}
