use crate::dto::HealthRes;

/// Simple health service used by the REST API and the combined binary.
///
/// This service provides a standardised way to check the health status of the growth engine.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Static health check; no instance needed.
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy and which reference table is loaded.
    pub fn check_health(reference_source: &str) -> HealthRes {
        HealthRes {
            ok: true,
            message: "growth engine is alive".into(),
            reference_source: reference_source.to_string(),
        }
    }
}
