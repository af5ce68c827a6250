//! Diabetes Prediction App
//!
//! Web form in front of an MLflow-served diabetes classifier. Each submit
//! is forwarded to the model server and the outcome is recorded as a run in
//! an MLflow tracking store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   DIABETES PREDICTION APP                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌──────────────┐   ┌─────────────────────┐ │
//! │  │   Form     │──▶│  Inference   │──▶│  Outcome Reporter   │ │
//! │  │ Collector  │   │   Client     │   │  (tracking store)   │ │
//! │  │  (Axum)    │   │  (reqwest)   │   │                     │ │
//! │  └────────────┘   └──────┬───────┘   └──────────┬──────────┘ │
//! │                          ▼                      ▼            │
//! │                 ┌─────────────────┐   ┌──────────────────┐   │
//! │                 │  /invocations   │   │ mlruns / MLflow  │   │
//! │                 └─────────────────┘   └──────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod models;
pub mod submission;
pub mod tracking;
pub mod views;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};

use inference::InferenceClient;
use tracking::TrackingStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub inference: Arc<InferenceClient>,
    pub tracking: Arc<dyn TrackingStore>,
}

impl AppState {
    /// Build the outgoing clients from configuration
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let inference = InferenceClient::new(&config.inference_url, config.inference_timeout())
            .context("Failed to create inference client")?;

        let tracking = tracking::connect(
            &config.tracking_uri,
            &config.experiment_name,
            config.inference_timeout(),
        )
        .with_context(|| format!("Failed to open tracking store {}", config.tracking_uri))?;

        Ok(Self {
            config,
            inference: Arc::new(inference),
            tracking,
        })
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    // Browser form
    let page_routes = Router::new()
        .route("/", get(handlers::form::index))
        .route("/predict", post(handlers::form::submit));

    let api_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/predict", post(handlers::api::predict));

    Router::new()
        .merge(page_routes)
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
