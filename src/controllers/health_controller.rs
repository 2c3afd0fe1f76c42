use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use crate::AppState;

// GET /api/health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.store.health().await;

    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "service": "TradeDesk API",
        "version": env!("CARGO_PKG_VERSION"),
        "appwrite": if store_ok { "connected" } else { "disconnected" },
        "metaapi": if state.metaapi.is_some() { "configured" } else { "not_configured" },
        "database": state.store.database_id,
    }))
}

// GET /api/status
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let connected = state.store.health().await;
    let databases = state.store.list_databases().await.unwrap_or_default();
    let collections = state.store.list_collections().await.unwrap_or_default();

    let project_prefix: String = state.settings.appwrite_project_id.chars().take(20).collect();

    Json(json!({
        "appwrite": {
            "connected": connected,
            "project_id": format!("{project_prefix}..."),
            "database_count": databases.len(),
            "collection_count": collections.len(),
        },
        "metaapi": {
            "configured": state.metaapi.is_some(),
            "token_length": state.settings.metaapi_token.as_deref().map_or(0, str::len),
        },
        "encryption": {
            "enabled": true,
            "key_length": state.settings.encryption_key.len(),
        },
    }))
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "not found", "details": null })),
    )
}
