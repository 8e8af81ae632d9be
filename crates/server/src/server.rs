//! HTTP surface of the predictor.
//!
//! - `POST /api/linear-regression`: predict a price from a feature object
//! - `GET /health`: liveness
//! - `GET /metrics`: Prometheus request counters

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use estate_ml::PricePredictor;

use crate::api::{parse_features, ApiError, PredictionResponse};
use crate::metrics::Metrics;

/// State shared by all handlers.
pub struct AppState {
    pub predictor: PricePredictor,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(predictor: PricePredictor) -> Self {
        Self {
            predictor,
            metrics: Metrics::new(),
        }
    }
}

/// `POST /api/linear-regression`
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<PredictionResponse>, ApiError> {
    state.metrics.record_request();

    let result = match parse_features(&body) {
        Ok(raw) => state.predictor.predict(&raw).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(prediction) => {
            state.metrics.record_success();
            tracing::info!(
                predicted_price = prediction.predicted_price,
                model_version = prediction.model_version,
                "prediction served"
            );
            Ok(Json(prediction.into()))
        }
        Err(err) => {
            state.metrics.record_failure(&err);
            if err.is_transient() {
                tracing::warn!(kind = err.kind(), error = %err, "prediction failed");
            } else {
                tracing::info!(kind = err.kind(), error = %err, "prediction rejected");
            }
            Err(ApiError(err))
        }
    }
}

/// `GET /health`
async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /metrics`
async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}

/// Build the router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/linear-regression", post(predict_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serve until `cancel` fires.
pub async fn run_server(state: Arc<AppState>, addr: &str, cancel: CancellationToken) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local: SocketAddr = listener.local_addr()?;
    tracing::info!(addr = %local, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
