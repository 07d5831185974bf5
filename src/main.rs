use std::path::PathBuf;
use std::sync::Arc;

use api_rest::{router, AppState};
use api_shared::auth::api_key_from_env_value;
use growth_core::config::{
    cache_capacity_from_env_value, resolve_reference_path, trend_ttl_from_env_value,
};
use growth_core::constants::DEFAULT_PATIENT_DATA_DIR;
use growth_core::{
    CoreConfig, FileRepository, GrowthService, MokaCache, ReferenceStore, ReferenceTable,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the growth analytics service
///
/// Resolves configuration from the environment once, loads the WHO reference table, and serves
/// the REST API (with Swagger UI at `/swagger-ui`).
///
/// # Environment Variables
/// - `GROWTH_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `PATIENT_DATA_DIR`: Directory for patient data storage (default: "patient_data")
/// - `GROWTH_REFERENCE_PATH`: WHO LMS table in YAML (default: the bundled 0-24 month table)
/// - `GROWTH_CACHE_CAPACITY`: Maximum cached entries (default: 10000)
/// - `GROWTH_TREND_TTL_SECS`: Lifetime of cached per-patient analytics (default: 300)
/// - `API_KEY`: API key required in the `x-api-key` header
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - any environment value is malformed or the reference table cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("growth_run=info".parse()?)
                .add_directive("growth_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("GROWTH_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let patient_data_dir = PathBuf::from(
        std::env::var("PATIENT_DATA_DIR").unwrap_or_else(|_| DEFAULT_PATIENT_DATA_DIR.into()),
    );
    if !patient_data_dir.exists() {
        anyhow::bail!(
            "Patient data directory does not exist: {}",
            patient_data_dir.display()
        );
    }

    let reference_path = resolve_reference_path(
        std::env::var("GROWTH_REFERENCE_PATH")
            .ok()
            .map(PathBuf::from),
    )?;
    let cache_capacity = cache_capacity_from_env_value(std::env::var("GROWTH_CACHE_CAPACITY").ok())?;
    let trend_ttl = trend_ttl_from_env_value(std::env::var("GROWTH_TREND_TTL_SECS").ok())?;

    let cfg = Arc::new(
        CoreConfig::new(patient_data_dir.clone(), reference_path)
            .with_cache_capacity(cache_capacity)
            .with_trend_ttl(trend_ttl),
    );

    let reference = ReferenceTable::load_or_bundled(cfg.reference_path())?;
    tracing::info!(
        "-- Loaded {} reference rows from '{}'",
        reference.len(),
        reference.source()
    );

    let api_key = api_key_from_env_value(std::env::var("API_KEY").ok());
    if api_key.is_none() {
        tracing::warn!("API_KEY is not set; authenticated routes will reject every request");
    }

    let service = GrowthService::new(
        cfg.clone(),
        Arc::new(reference),
        Arc::new(FileRepository::new(patient_data_dir)),
        Arc::new(MokaCache::new(cfg.cache_capacity())),
    );
    let app = router(AppState::new(Arc::new(service), api_key));

    tracing::info!("++ Starting growth REST API on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down");
        })
        .await?;

    Ok(())
}
