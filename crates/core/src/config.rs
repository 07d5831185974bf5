//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into services by `Arc`. Core code
//! never reads environment variables while handling a request.

use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_TREND_TTL};
use crate::{GrowthError, GrowthResult};
use growth_types::ChartType;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Monthly growth-rate bands used to label velocity as slow, normal or fast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VelocityThresholds {
    /// Rates strictly below this (per month) are slow.
    pub slow_below: f64,
    /// Rates strictly above this (per month) are fast.
    pub fast_above: f64,
}

impl VelocityThresholds {
    pub fn new(slow_below: f64, fast_above: f64) -> GrowthResult<Self> {
        if !slow_below.is_finite() || !fast_above.is_finite() || slow_below >= fast_above {
            return Err(GrowthError::InvalidInput(format!(
                "velocity thresholds must satisfy slow_below < fast_above, got {slow_below} / {fast_above}"
            )));
        }
        Ok(Self {
            slow_below,
            fast_above,
        })
    }

    /// Default bands: kg/month for weight, cm/month for length and head circumference.
    pub fn default_for(chart_type: ChartType) -> Self {
        match chart_type {
            ChartType::WeightForAge => Self {
                slow_below: 0.1,
                fast_above: 0.5,
            },
            ChartType::HeightForAge => Self {
                slow_below: 0.5,
                fast_above: 3.0,
            },
            ChartType::HeadCircumferenceForAge => Self {
                slow_below: 0.2,
                fast_above: 2.0,
            },
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    patient_data_dir: PathBuf,
    reference_path: Option<PathBuf>,
    cache_capacity: u64,
    trend_ttl: Duration,
    weight_velocity: VelocityThresholds,
    height_velocity: VelocityThresholds,
    head_velocity: VelocityThresholds,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default cache and velocity settings.
    pub fn new(patient_data_dir: PathBuf, reference_path: Option<PathBuf>) -> Self {
        Self {
            patient_data_dir,
            reference_path,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            trend_ttl: DEFAULT_TREND_TTL,
            weight_velocity: VelocityThresholds::default_for(ChartType::WeightForAge),
            height_velocity: VelocityThresholds::default_for(ChartType::HeightForAge),
            head_velocity: VelocityThresholds::default_for(ChartType::HeadCircumferenceForAge),
        }
    }

    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_trend_ttl(mut self, ttl: Duration) -> Self {
        self.trend_ttl = ttl;
        self
    }

    pub fn with_velocity_thresholds(
        mut self,
        chart_type: ChartType,
        thresholds: VelocityThresholds,
    ) -> Self {
        match chart_type {
            ChartType::WeightForAge => self.weight_velocity = thresholds,
            ChartType::HeightForAge => self.height_velocity = thresholds,
            ChartType::HeadCircumferenceForAge => self.head_velocity = thresholds,
        }
        self
    }

    pub fn patient_data_dir(&self) -> &Path {
        &self.patient_data_dir
    }

    /// `None` means the bundled reference table.
    pub fn reference_path(&self) -> Option<&Path> {
        self.reference_path.as_deref()
    }

    pub fn cache_capacity(&self) -> u64 {
        self.cache_capacity
    }

    pub fn trend_ttl(&self) -> Duration {
        self.trend_ttl
    }

    pub fn velocity_thresholds(&self, chart_type: ChartType) -> VelocityThresholds {
        match chart_type {
            ChartType::WeightForAge => self.weight_velocity,
            ChartType::HeightForAge => self.height_velocity,
            ChartType::HeadCircumferenceForAge => self.head_velocity,
        }
    }
}

/// Resolve the reference table path without reading environment variables.
///
/// An override must point at an existing file. No override means the bundled table.
pub fn resolve_reference_path(override_path: Option<PathBuf>) -> GrowthResult<Option<PathBuf>> {
    match override_path {
        Some(path) if path.is_file() => Ok(Some(path)),
        Some(path) => Err(GrowthError::InvalidInput(format!(
            "GROWTH_REFERENCE_PATH is not a file: {}",
            path.display()
        ))),
        None => Ok(None),
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the cache capacity from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default capacity.
pub fn cache_capacity_from_env_value(value: Option<String>) -> GrowthResult<u64> {
    let Some(value) = trimmed(value) else {
        return Ok(DEFAULT_CACHE_CAPACITY);
    };
    match value.parse::<u64>() {
        Ok(capacity) if capacity > 0 => Ok(capacity),
        _ => Err(GrowthError::InvalidInput(format!(
            "GROWTH_CACHE_CAPACITY must be a positive integer, got '{value}'"
        ))),
    }
}

/// Parse the per-patient analytics TTL (seconds) from an optional string value.
pub fn trend_ttl_from_env_value(value: Option<String>) -> GrowthResult<Duration> {
    let Some(value) = trimmed(value) else {
        return Ok(DEFAULT_TREND_TTL);
    };
    value.parse::<u64>().map(Duration::from_secs).map_err(|_| {
        GrowthError::InvalidInput(format!(
            "GROWTH_TREND_TTL_SECS must be a whole number of seconds, got '{value}'"
        ))
    })
}
