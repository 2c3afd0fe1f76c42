use axum::{routing::get, Router};

use crate::{controllers::news_controller, AppState};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route(
        "/api/news",
        get(news_controller::get_news).post(news_controller::create_news),
    )
}
