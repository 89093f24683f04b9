pub mod auth;
pub mod error;
pub mod validation;

use axum::{routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: String,
    pub timestamp: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "Server is running".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
