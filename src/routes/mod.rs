use axum::Router;
use tower_http::cors::CorsLayer;

use crate::{controllers::health_controller, AppState};

pub mod health_routes;
pub mod news_routes;
pub mod trading_routes;
pub mod user_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = health_routes::add_routes(router);
    let router = user_routes::add_routes(router);
    let router = trading_routes::add_routes(router);
    let router = news_routes::add_routes(router);

    router
        .fallback(health_controller::not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
