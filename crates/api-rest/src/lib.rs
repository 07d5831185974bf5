//! # API REST
//!
//! REST API implementation for the growth engine.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, header-based auth)
//!
//! Uses `api-shared` for wire types and auth utilities. Every route except `/health` requires
//! `x-api-key`; patient routes additionally require `x-tenant-id`.

#![warn(rust_2018_idioms)]

use api_shared::{
    validate_api_key, AuthError, ChartRes, CompareQuery, CompareRes, ErrorRes, HealthRes,
    HealthService, ProjectionEnvelopeRes, ProjectionQuery, RecordMeasurementReq,
    RecordMeasurementRes, TrendsQuery, TrendsRes, VelocityEnvelopeRes, VelocityQuery, ZScoreReq,
    ZScoreRes, API_KEY_HEADER, TENANT_HEADER,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use growth_core::analytics::{CompareMode, CompareParams};
use growth_core::repositories::DateRange;
use growth_core::{AccessContext, ErrorKind, GrowthError, GrowthService};
use growth_types::{ChartType, Gender, PatientId};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

/// Horizon used when a projection request does not name one.
const DEFAULT_HORIZON_MONTHS: u32 = 12;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<GrowthService>,
    api_key: Option<Arc<str>>,
}

impl AppState {
    /// `api_key` is the value resolved from `API_KEY` at startup; `None` rejects every
    /// authenticated request.
    pub fn new(service: Arc<GrowthService>, api_key: Option<String>) -> Self {
        Self {
            service,
            api_key: api_key.map(Arc::from),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        z_score,
        growth_chart,
        record_measurement,
        delete_measurement,
        growth_trends,
        growth_velocity,
        growth_projection,
        compare_growth,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        ZScoreReq,
        ZScoreRes,
        api_shared::ReferenceValuesRes,
        ChartRes,
        api_shared::ChartPointRes,
        RecordMeasurementReq,
        RecordMeasurementRes,
        api_shared::ChartResultRes,
        TrendsRes,
        api_shared::TrendPointRes,
        api_shared::TrendSummaryRes,
        api_shared::VelocityRes,
        VelocityEnvelopeRes,
        api_shared::ProjectionRes,
        api_shared::ProjectedPointRes,
        ProjectionEnvelopeRes,
        CompareRes,
        Gender,
        ChartType,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/growth/z-score", post(z_score))
        .route("/growth/charts/:gender/:chart", get(growth_chart))
        .route("/patients/:id/measurements", post(record_measurement))
        .route(
            "/patients/:id/measurements/:measurement_id",
            delete(delete_measurement),
        )
        .route("/patients/:id/growth/compare", get(compare_growth))
        .route("/patients/:id/growth/:chart/trends", get(growth_trends))
        .route("/patients/:id/growth/:chart/velocity", get(growth_velocity))
        .route("/patients/:id/growth/:chart/projection", get(growth_projection))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Errors and request context
// ============================================================================

/// Error response: a status code plus an [`ErrorRes`] body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorRes,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorRes {
                error: error.to_string(),
                message: message.into(),
            },
        }
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error")
    }
}

impl From<GrowthError> for ApiError {
    fn from(err: GrowthError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Self::new(StatusCode::NOT_FOUND, "not_found", err.to_string()),
            ErrorKind::Forbidden => Self::new(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
            ErrorKind::InvalidInput => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
            }
            ErrorKind::Internal => {
                tracing::error!("Request failed: {:?}", err);
                Self::internal()
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotConfigured => {
                tracing::error!("{err}");
                Self::internal()
            }
            AuthError::Missing | AuthError::Invalid => {
                Self::new(StatusCode::UNAUTHORIZED, "unauthorised", err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn require_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    validate_api_key(header(headers, API_KEY_HEADER), state.api_key.as_deref())?;
    Ok(())
}

fn access_context(state: &AppState, headers: &HeaderMap) -> Result<AccessContext, ApiError> {
    require_api_key(state, headers)?;
    let tenant = header(headers, TENANT_HEADER).ok_or_else(|| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            format!("missing {TENANT_HEADER} header"),
        )
    })?;
    Ok(AccessContext::for_tenant(tenant)?)
}

fn parse_patient_id(id: &str) -> Result<PatientId, ApiError> {
    Ok(PatientId::parse(id).map_err(GrowthError::from)?)
}

fn parse_chart(chart: &str) -> Result<ChartType, ApiError> {
    Ok(ChartType::from_str(chart).map_err(GrowthError::from)?)
}

// ============================================================================
// Handlers
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API.
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health(
        state.service.calculator().store().source(),
    ))
}

#[utoipa::path(
    post,
    path = "/growth/z-score",
    request_body = ZScoreReq,
    responses(
        (status = 200, description = "Z-score, percentile and classification", body = ZScoreRes),
        (status = 400, description = "Negative age or non-positive value", body = ErrorRes),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes),
        (status = 404, description = "No reference data for gender and chart", body = ErrorRes)
    )
)]
/// Assess a single measurement against the WHO reference.
#[axum::debug_handler]
async fn z_score(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ZScoreReq>,
) -> Result<Json<ZScoreRes>, ApiError> {
    require_api_key(&state, &headers)?;
    let result =
        state
            .service
            .calculate_z_score(req.gender, req.chart_type, req.age_days, req.value)?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    get,
    path = "/growth/charts/{gender}/{chart}",
    params(
        ("gender" = String, Path, description = "MALE or FEMALE"),
        ("chart" = String, Path, description = "WFA, HFA or HcFA")
    ),
    responses(
        (status = 200, description = "Reference curves for plotting", body = ChartRes),
        (status = 400, description = "Unknown gender or chart", body = ErrorRes),
        (status = 404, description = "No reference data", body = ErrorRes)
    )
)]
/// Reference curves (median, +/-2 SD, +/-3 SD) for one gender and chart.
#[axum::debug_handler]
async fn growth_chart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((gender, chart)): Path<(String, String)>,
) -> Result<Json<ChartRes>, ApiError> {
    require_api_key(&state, &headers)?;
    let gender = Gender::from_str(&gender).map_err(GrowthError::from)?;
    let chart = state.service.growth_chart(gender, parse_chart(&chart)?)?;
    Ok(Json(chart.into()))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/measurements",
    params(("id" = String, Path, description = "Patient id (32 hex characters)")),
    request_body = RecordMeasurementReq,
    responses(
        (status = 201, description = "Measurement stored with its growth results", body = RecordMeasurementRes),
        (status = 400, description = "Invalid measurement", body = ErrorRes),
        (status = 403, description = "Patient belongs to another tenant", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Record a measurement and compute its growth results.
#[axum::debug_handler]
async fn record_measurement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RecordMeasurementReq>,
) -> Result<(StatusCode, Json<RecordMeasurementRes>), ApiError> {
    let ctx = access_context(&state, &headers)?;
    let patient_id = parse_patient_id(&id)?;
    let recorded = state
        .service
        .record_measurement(&ctx, &patient_id, req.into())?;
    Ok((StatusCode::CREATED, Json(recorded.into())))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}/measurements/{measurement_id}",
    params(
        ("id" = String, Path, description = "Patient id"),
        ("measurement_id" = Uuid, Path, description = "Measurement id")
    ),
    responses(
        (status = 204, description = "Measurement deleted"),
        (status = 403, description = "Patient belongs to another tenant", body = ErrorRes),
        (status = 404, description = "Unknown patient or measurement", body = ErrorRes)
    )
)]
/// Delete a measurement.
#[axum::debug_handler]
async fn delete_measurement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, measurement_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let ctx = access_context(&state, &headers)?;
    let patient_id = parse_patient_id(&id)?;
    state
        .service
        .delete_measurement(&ctx, &patient_id, measurement_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/patients/{id}/growth/{chart}/trends",
    params(
        ("id" = String, Path, description = "Patient id"),
        ("chart" = String, Path, description = "WFA, HFA or HcFA"),
        TrendsQuery
    ),
    responses(
        (status = 200, description = "Scored series with summary and velocity", body = TrendsRes),
        (status = 403, description = "Patient belongs to another tenant", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Growth trend for one chart.
#[axum::debug_handler]
async fn growth_trends(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, chart)): Path<(String, String)>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<TrendsRes>, ApiError> {
    let ctx = access_context(&state, &headers)?;
    let patient_id = parse_patient_id(&id)?;
    let range = DateRange::new(query.from, query.to)?;
    let trends =
        state
            .service
            .get_growth_trends(&ctx, &patient_id, parse_chart(&chart)?, Some(range))?;
    Ok(Json(trends.into()))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/growth/{chart}/velocity",
    params(
        ("id" = String, Path, description = "Patient id"),
        ("chart" = String, Path, description = "WFA, HFA or HcFA"),
        VelocityQuery
    ),
    responses(
        (status = 200, description = "Velocity, or null with fewer than two measurements", body = VelocityEnvelopeRes),
        (status = 400, description = "Start after end", body = ErrorRes),
        (status = 403, description = "Patient belongs to another tenant", body = ErrorRes)
    )
)]
/// Growth velocity between the first and last measurement in a window.
#[axum::debug_handler]
async fn growth_velocity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, chart)): Path<(String, String)>,
    Query(query): Query<VelocityQuery>,
) -> Result<Json<VelocityEnvelopeRes>, ApiError> {
    let ctx = access_context(&state, &headers)?;
    let patient_id = parse_patient_id(&id)?;
    let velocity = state.service.calculate_velocity(
        &ctx,
        &patient_id,
        parse_chart(&chart)?,
        query.start,
        query.end,
    )?;
    Ok(Json(VelocityEnvelopeRes {
        velocity: velocity.map(Into::into),
    }))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/growth/{chart}/projection",
    params(
        ("id" = String, Path, description = "Patient id"),
        ("chart" = String, Path, description = "WFA, HFA or HcFA"),
        ProjectionQuery
    ),
    responses(
        (status = 200, description = "Projection, or null with fewer than two measurements", body = ProjectionEnvelopeRes),
        (status = 400, description = "Horizon out of range", body = ErrorRes),
        (status = 403, description = "Patient belongs to another tenant", body = ErrorRes)
    )
)]
/// Linear growth projection in 3-month steps.
#[axum::debug_handler]
async fn growth_projection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, chart)): Path<(String, String)>,
    Query(query): Query<ProjectionQuery>,
) -> Result<Json<ProjectionEnvelopeRes>, ApiError> {
    let ctx = access_context(&state, &headers)?;
    let patient_id = parse_patient_id(&id)?;
    let projection = state.service.get_growth_projection(
        &ctx,
        &patient_id,
        parse_chart(&chart)?,
        query.horizon_months.unwrap_or(DEFAULT_HORIZON_MONTHS),
    )?;
    Ok(Json(ProjectionEnvelopeRes {
        projection: projection.map(Into::into),
    }))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/growth/compare",
    params(("id" = String, Path, description = "Patient id"), CompareQuery),
    responses(
        (status = 200, description = "Comparison result; status no_data without measurements", body = CompareRes),
        (status = 400, description = "Unknown mode or missing parameter", body = ErrorRes),
        (status = 403, description = "Patient belongs to another tenant", body = ErrorRes)
    )
)]
/// Compare growth by age, percentile or velocity.
#[axum::debug_handler]
async fn compare_growth(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<CompareRes>, ApiError> {
    let ctx = access_context(&state, &headers)?;
    let patient_id = parse_patient_id(&id)?;
    let mode = CompareMode::from_str(&query.mode)?;
    let params = CompareParams {
        chart_type: match query.chart_type.as_deref() {
            Some(chart) => parse_chart(chart)?,
            None => ChartType::WeightForAge,
        },
        reference_age_months: query.reference_age_months,
        window_days: query.window_days,
    };
    let comparison = state
        .service
        .compare_growth(&ctx, &patient_id, mode, &params)?;
    Ok(Json(comparison.into()))
}
