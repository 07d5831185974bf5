//! # API Shared
//!
//! Shared utilities and definitions for the growth APIs.
//!
//! Contains:
//! - Request/response types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - Authentication utilities
//!
//! Used by `api-rest` and the `growth-run` binary.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{validate_api_key, AuthError, API_KEY_HEADER, TENANT_HEADER};
pub use dto::*;
pub use health::HealthService;
