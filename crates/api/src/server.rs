//! HTTP server for the bankruptcy prediction model.
//!
//! ## Endpoints
//!
//! - `GET /` — static welcome message
//! - `POST /predict` — validate a record of financial ratios and classify it
//! - `GET /schema` — accepted request fields with bounds and feature names
//! - `GET /health` — simple liveness check

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use bp_ml::features::InputRecord;
use bp_ml::predictor::BankruptcyPredictor;

use crate::error::ApiError;
use crate::validate::{self, FIELDS};

pub const WELCOME_MESSAGE: &str = "Welcome to the Bankruptcy Prediction API!";

/// Shared, read-only state for all handlers.
pub struct AppState {
    pub predictor: BankruptcyPredictor,
}

impl AppState {
    /// Wrap a loaded predictor, logging any mismatch between the request
    /// fields and the feature list. Mismatched fields fail per request.
    pub fn new(predictor: BankruptcyPredictor) -> Self {
        for problem in validate::schema_drift(predictor.schema()) {
            tracing::warn!(%problem, "request fields and feature list disagree");
        }
        Self { predictor }
    }
}

/// JSON response for `GET /`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// JSON response for `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// 0 = not bankrupt, 1 = bankrupt.
    pub prediction: u8,
    /// Probability of bankruptcy, in [0, 1].
    pub probability: f64,
    /// The accepted input record, echoed back unchanged.
    pub input_values: InputRecord,
}

/// One entry of the `GET /schema` response.
#[derive(Debug, Serialize)]
struct FieldDoc {
    name: &'static str,
    /// Training-time column name, absent if the feature list lacks the field.
    feature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    le: Option<f64>,
    description: &'static str,
}

/// JSON response for the `/health` endpoint.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/predict", post(predict_handler))
        .route("/schema", get(schema_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /` — welcome message.
async fn root_handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME_MESSAGE.to_string(),
    })
}

/// `POST /predict` — validate, scale and classify one record.
///
/// Validation failures never reach the model. A failure inside the model
/// pipeline yields no partial result.
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "rejected request body");
        ApiError::from(rejection)
    })?;

    let record = validate::validate(&body).map_err(|errors| {
        tracing::warn!(%errors, "request failed validation");
        ApiError::from(errors)
    })?;

    let prediction = state.predictor.predict(&record).map_err(|e| {
        tracing::error!(error = %e, "prediction failed");
        ApiError::from(e)
    })?;

    tracing::info!(
        prediction = prediction.class,
        probability = prediction.probability,
        "prediction served"
    );

    Ok(Json(PredictionResponse {
        prediction: prediction.class,
        probability: prediction.probability,
        input_values: record,
    }))
}

/// `GET /schema` — accepted request fields.
async fn schema_handler(State(state): State<Arc<AppState>>) -> Json<Vec<FieldDoc>> {
    let schema = state.predictor.schema();
    let docs = FIELDS
        .iter()
        .map(|rule| FieldDoc {
            name: rule.name,
            feature: schema.canonical(rule.name).map(str::to_string),
            ge: rule.ge,
            le: rule.le,
            description: rule.description,
        })
        .collect();
    Json(docs)
}

/// `GET /health` — simple liveness check.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Bind `addr` and serve until `cancel` fires.
pub async fn run_server(
    state: Arc<AppState>,
    addr: &str,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
