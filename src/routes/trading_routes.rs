use axum::{
    routing::{get, post},
    Router,
};

use crate::{controllers::trading_controller, AppState};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/trade", post(trading_controller::place_trade))
        .route(
            "/api/users/:id/positions",
            get(trading_controller::get_positions),
        )
        .route(
            "/api/positions/close",
            post(trading_controller::close_position),
        )
        .route("/api/users/:id/orders", get(trading_controller::get_orders))
}
