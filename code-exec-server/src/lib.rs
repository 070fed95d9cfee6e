use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use code_exec::{
    languages,
    CodeExecutionService, ExecutionOutcome, ExecutionRequest, SandboxConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Configuration error: {0}")]
    Config(#[from] code_exec::Error),
    #[error("Server error: {0}")]
    ServerError(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Config(_) | ServerError::ServerError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub available_slots: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub id: String,
    pub mode: String,
    pub available: bool,
}

#[derive(Clone)]
pub struct AppState {
    service: Arc<CodeExecutionService>,
}

pub fn create_app(config: SandboxConfig) -> Result<Router, ServerError> {
    let service = CodeExecutionService::new(config)?;

    let state = AppState {
        service: Arc::new(service),
    };

    let cors = CorsLayer::permissive();

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/languages", get(list_languages))
        .route("/execute", post(execute))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;
    serve(listener, app).await
}

/// Serve `app` on an already-bound listener
pub async fn serve(listener: TcpListener, app: Router) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        info!("Starting code execution server on {}", addr);
    }

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    Ok(())
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        available_slots: state.service.get_available_slots(),
    })
}

async fn list_languages() -> Json<Vec<LanguageInfo>> {
    let languages = languages::toolchain_status()
        .into_iter()
        .map(|(profile, available)| LanguageInfo {
            id: profile.id.to_string(),
            mode: profile.mode.name().to_string(),
            available,
        })
        .collect();
    Json(languages)
}

async fn execute(
    State(state): State<AppState>,
    Json(payload): Json<ExecutionRequest>,
) -> Result<Json<ExecutionOutcome>, ServerError> {
    if payload.code.is_empty() || payload.language.trim().is_empty() {
        return Err(ServerError::BadRequest(
            "Code and language are required".to_string(),
        ));
    }

    Ok(Json(state.service.execute(payload).await))
}
