//! # Growth Core
//!
//! Pediatric growth analytics against the WHO Child Growth Standards.
//!
//! This crate contains the numeric engine and its persistence seam:
//! - WHO LMS reference tables with age interpolation
//! - Z-scores, percentiles and per-chart clinical classification
//! - Trends, velocity, projection and comparison over a patient's measurement history
//! - An injectable cache and a repository trait with in-memory and YAML file implementations
//!
//! **No API concerns**: authentication and HTTP belong in `api-shared` and `api-rest`.

pub mod access;
pub mod analytics;
pub mod cache;
pub mod calculator;
pub mod classification;
pub mod config;
pub mod constants;
pub mod error;
pub mod interpolation;
pub mod lms;
pub mod percentile;
pub mod reference;
pub mod repositories;
pub mod service;
pub mod validation;

pub use access::AccessContext;
pub use cache::{CacheProvider, MokaCache, NoopCache};
pub use calculator::{GrowthCalculator, ReferenceValues, ZScoreResult};
pub use classification::Classification;
pub use config::{CoreConfig, VelocityThresholds};
pub use error::{ErrorKind, GrowthError, GrowthResult};
pub use reference::{ReferenceStore, ReferenceTable};
pub use repositories::{file::FileRepository, memory::InMemoryRepository, GrowthRepository};
pub use service::GrowthService;

pub use growth_types::{ChartType, Gender, NonEmptyText, PatientId};

/// Converts an age in days to WHO months (30.4375 days each).
pub fn age_days_to_months(age_days: i64) -> f64 {
    age_days as f64 / constants::WHO_DAYS_PER_MONTH
}
