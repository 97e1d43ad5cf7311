//! Grant Tag System Backend
//!
//! A REST backend for grants and the tags attached to them, persisted in SQLite.

mod api;
mod config;
mod db;
mod errors;
mod models;

use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_tracing(&config.log_level);

    tracing::info!(
        db_path = ?config.db_path,
        bind_addr = %config.bind_addr,
        "Starting Grant Tag System Backend"
    );

    let pool = db::init_database(&config.db_path, config.max_connections).await?;
    let repo = Arc::new(Repository::new(pool));

    if !config.seed_data {
        tracing::info!("Seed data disabled (GRANTS_SEED)");
    } else if !db::seed_if_empty(&repo).await? {
        tracing::debug!("Store already populated, skipping seed data");
    }

    let app = create_router(AppState { repo });
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let grant_routes = Router::new()
        .route("/grants", get(api::list_grants).post(api::create_grant))
        .route(
            "/grants/{id}",
            get(api::get_grant)
                .put(api::update_grant)
                .delete(api::delete_grant),
        );

    let tag_routes = Router::new()
        .route("/tags", get(api::list_tags).post(api::create_tag))
        .route(
            "/tags/{id}",
            put(api::update_tag)
                .get(api::get_tag)
                .delete(api::delete_tag),
        )
        .route("/tags/{id}/grants", get(api::list_grants_by_tag));

    let api_routes = grant_routes
        .merge(tag_routes)
        .route("/health", get(api::health_check));

    // The browser client is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(api::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests;
