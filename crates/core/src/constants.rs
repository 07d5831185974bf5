//! Constants used throughout the growth core crate.

use std::time::Duration;

/// Default directory for patient data storage when no explicit directory is configured.
pub const DEFAULT_PATIENT_DATA_DIR: &str = "patient_data";

/// Filename for the patient demographics stub (id, date of birth, gender, tenant).
pub const PATIENT_YAML_FILENAME: &str = "patient.yaml";

/// Filename for a patient's measurement history and persisted growth results.
pub const MEASUREMENTS_YAML_FILENAME: &str = "measurements.yaml";

/// WHO excerpt embedded in the binary, used when no reference file is configured.
pub const BUNDLED_REFERENCE_YAML: &str = include_str!("../data/who_lms_0_24m.yaml");

/// Days per month used by the WHO tables to convert `age_days` to `age_months`.
pub const WHO_DAYS_PER_MONTH: f64 = 30.4375;

/// Month length used when expressing growth velocity per month.
pub const VELOCITY_DAYS_PER_MONTH: f64 = 30.44;

/// Year length used when expressing growth velocity per year.
pub const VELOCITY_DAYS_PER_YEAR: f64 = 365.25;

/// Below this magnitude the Box-Cox power `L` is treated as zero (log form).
pub const LMS_L_EPSILON: f64 = 1e-9;

/// Z-scores beyond this magnitude are clamped when converted to percentiles.
pub const PERCENTILE_Z_CLAMP: f64 = 5.0;
pub const PERCENTILE_UPPER_CLAMP: f64 = 99.9999;
pub const PERCENTILE_LOWER_CLAMP: f64 = 0.0001;

/// Decimal places applied at the API boundary.
pub const Z_SCORE_DECIMALS: u32 = 3;
pub const PERCENTILE_DECIMALS: u32 = 1;

/// Projection step length and the maximum horizon accepted.
pub const PROJECTION_STEP_MONTHS: u32 = 3;
pub const MAX_PROJECTION_HORIZON_MONTHS: u32 = 60;
/// Number of most recent intervals averaged for the projection rate.
pub const PROJECTION_RATE_INTERVALS: usize = 3;

/// Default lookback window for the velocity comparison.
pub const DEFAULT_VELOCITY_WINDOW_DAYS: i64 = 90;

pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;
pub const DEFAULT_TREND_TTL: Duration = Duration::from_secs(300);
