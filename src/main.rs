//! Versions Backend
//!
//! A REST backend that aggregates website deployment versions from remote
//! sources and serves them over HTTP, degrading to synthesized data when
//! every source is unavailable.

mod aggregator;
mod api;
mod config;
mod errors;
mod models;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aggregator::{
    DeploymentsApiSettings, JsonEndpointSource, LinkDefaults, PagesDeploymentsSource,
    VersionAggregator, VersionSource,
};
use config::Config;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<VersionAggregator>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Versions Backend");
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Configured source endpoints: {}", config.source_urls.len());

    // Assemble the aggregator from the configured sources
    let aggregator = Arc::new(build_aggregator(&config)?);

    // Create application state
    let state = AppState { aggregator };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the aggregator: one client shared by every source, JSON endpoint
/// sources from the configured URL list, and the Pages deployments source
/// when its credentials are present.
fn build_aggregator(config: &Config) -> Result<VersionAggregator, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    let mut sources: Vec<Arc<dyn VersionSource>> = config
        .source_urls
        .iter()
        .map(|url| {
            Arc::new(JsonEndpointSource::new(url.clone(), client.clone(), url.clone()))
                as Arc<dyn VersionSource>
        })
        .collect();

    match (
        &config.pages_account_id,
        &config.pages_api_token,
        &config.pages_project,
    ) {
        (Some(account_id), Some(api_token), Some(project_name)) => {
            sources.push(Arc::new(PagesDeploymentsSource::new(
                client,
                DeploymentsApiSettings {
                    api_base: config.pages_api_base.clone(),
                    account_id: account_id.clone(),
                    api_token: api_token.clone(),
                    project_name: project_name.clone(),
                },
            )));
        }
        _ => {
            tracing::info!("Pages deployments API credentials not configured, source disabled");
        }
    }

    if sources.is_empty() {
        tracing::warn!("No version sources configured. Every response will carry the fallback record!");
    }

    Ok(VersionAggregator::new(
        sources,
        LinkDefaults {
            website: config.canonical_website.clone(),
            repository: config.canonical_repository.clone(),
        },
    ))
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        .route("/versions", get(api::list_versions))
        .route("/versions/{version}", get(api::get_version));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
