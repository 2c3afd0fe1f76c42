use axum::{routing::get, Router};

use crate::{controllers::health_controller, AppState};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/health", get(health_controller::health))
        .route("/api/status", get(health_controller::status))
}
