//! Tenant scoping for patient-level operations.

use crate::repositories::PatientRecord;
use crate::{GrowthError, GrowthResult};
use growth_types::NonEmptyText;

/// Who is asking. Every patient-scoped call carries one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessContext {
    tenant_id: NonEmptyText,
}

impl AccessContext {
    pub fn new(tenant_id: NonEmptyText) -> Self {
        Self { tenant_id }
    }

    /// # Errors
    ///
    /// Returns a `Types` error if `tenant_id` is blank.
    pub fn for_tenant(tenant_id: &str) -> GrowthResult<Self> {
        Ok(Self::new(NonEmptyText::new(tenant_id)?))
    }

    pub fn tenant_id(&self) -> &NonEmptyText {
        &self.tenant_id
    }

    /// Checks the caller may see `patient`.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` when the patient belongs to another tenant.
    pub fn authorise(&self, patient: &PatientRecord) -> GrowthResult<()> {
        if patient.tenant_id == self.tenant_id {
            return Ok(());
        }
        tracing::warn!(patient_id = %patient.id, "tenant mismatch");
        Err(GrowthError::Forbidden(format!(
            "patient {} is not visible to this tenant",
            patient.id
        )))
    }
}
