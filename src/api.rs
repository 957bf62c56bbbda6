//! REST API server for the banking assistant
//!
//! Exposes the command router over HTTP so other front-ends can relay
//! customer messages.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::commands::CommandRouter;
use crate::models::{InboundMessage, UserId};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageRequest {
    pub user_id: i64,
    pub display_name: Option<String>,
    pub text: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub router: Arc<CommandRouter>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Message Endpoint
/// =============================

async fn message_handler(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let message = InboundMessage::direct(
        UserId(req.user_id),
        req.display_name.unwrap_or_default(),
        req.text,
    );
    info!(user = %message.user_id, "Received message over HTTP");

    match state.router.route(&message).await {
        Some(reply) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "reply": reply.text,
                "kind": reply.kind,
            }))),
        ),
        None => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("No text content to interpret".into())),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(router: Arc<CommandRouter>) -> Router {
    let state = ApiState { router };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/message", post(message_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    router: Arc<CommandRouter>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let app = create_router(router);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
