use axum::{
    routing::{get, post},
    Router,
};

use crate::{controllers::user_controller, AppState};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/users/connect", post(user_controller::connect))
        .route("/api/users/:id", get(user_controller::get_user))
        .route("/api/users/:id/account", get(user_controller::get_account))
}
