//! HTTP API for intents, chain discovery and settlement

use crate::config::ApiConfig;
use crate::coordination::SettlementCoordinator;
use crate::error::{ServiceError, ServiceResult};
use crate::intent::{Intent, IntentId, NewIntent, Settlement};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SettlementCoordinator>,
}

/// Build the API router
pub fn router(coordinator: Arc<SettlementCoordinator>) -> Router {
    let state = AppState { coordinator };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/intents", post(create_intent).get(list_intents))
        .route("/intents/:id", get(get_intent).delete(cancel_intent))
        .route("/solve/:id", post(solve_chain))
        .route("/settle", post(settle_chain))
        .route("/settlements", get(list_settlements))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_server(
    config: ApiConfig,
    coordinator: Arc<SettlementCoordinator>,
) -> ServiceResult<()> {
    let app = router(coordinator);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::IntentNotFound { .. } | ServiceError::NoChain { .. } => {
                StatusCode::NOT_FOUND
            }
            ServiceError::InvalidChain(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let detail = match &self {
            ServiceError::IntentNotFound { .. } => "Intent not found".to_string(),
            ServiceError::NoChain { .. } => "No chain found for this intent".to_string(),
            err if err.is_client_error() => err.to_string(),
            err => {
                error!("Request failed: {}", err);
                "Internal server error".to_string()
            }
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::InvalidInput(rejection.body_text())
    }
}

async fn root() -> impl IntoResponse {
    Json(MessageResponse {
        message: "API up. POST /intents, /solve/:id and /settle.".to_string(),
    })
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check - verify the store answers
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.coordinator.health_check().await.is_ok();
    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: store_ok,
            store: store_ok,
        }),
    )
}

async fn create_intent(
    State(state): State<AppState>,
    payload: Result<Json<NewIntent>, JsonRejection>,
) -> ServiceResult<Json<Intent>> {
    let Json(payload) = payload?;
    Ok(Json(state.coordinator.post_intent(payload).await?))
}

async fn list_intents(State(state): State<AppState>) -> ServiceResult<Json<Vec<Intent>>> {
    Ok(Json(state.coordinator.intents().await?))
}

async fn get_intent(
    State(state): State<AppState>,
    Path(id): Path<IntentId>,
) -> ServiceResult<Json<Intent>> {
    Ok(Json(state.coordinator.intent(id).await?))
}

async fn cancel_intent(
    State(state): State<AppState>,
    Path(id): Path<IntentId>,
) -> ServiceResult<Json<CancelResponse>> {
    state.coordinator.cancel_intent(id).await?;
    Ok(Json(CancelResponse {
        status: "ok".to_string(),
        message: "Intent canceled".to_string(),
    }))
}

async fn solve_chain(
    State(state): State<AppState>,
    Path(id): Path<IntentId>,
) -> ServiceResult<Json<ChainBody>> {
    let chain = state.coordinator.discover(id).await?;
    Ok(Json(ChainBody { chain }))
}

async fn settle_chain(
    State(state): State<AppState>,
    payload: Result<Json<ChainBody>, JsonRejection>,
) -> ServiceResult<Json<Settlement>> {
    let Json(payload) = payload?;
    Ok(Json(state.coordinator.settle(&payload.chain).await?))
}

async fn list_settlements(State(state): State<AppState>) -> ServiceResult<Json<Vec<Settlement>>> {
    Ok(Json(state.coordinator.settlements().await?))
}

// Request and response types

#[derive(Serialize, Deserialize)]
struct ChainBody {
    chain: Vec<IntentId>,
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct CancelResponse {
    status: String,
    message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    store: bool,
}
