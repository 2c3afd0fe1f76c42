use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::models::News;
use crate::services::news_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct CreateNewsRequest {
    pub title: String,
    pub content: String,
    pub source: String,
    pub category: String,
    #[serde(default = "Utc::now")]
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub source: String,
    pub category: String,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
}

impl From<News> for NewsResponse {
    fn from(n: News) -> Self {
        Self {
            id: n.id,
            title: n.title,
            content: n.content,
            source: n.source,
            category: n.category,
            published_at: n.published_at,
            image_url: n.image_url,
        }
    }
}

// GET /api/news?category=&limit=
pub async fn get_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<Vec<NewsResponse>>, ApiError> {
    let articles = news_service::list(&state, query.category.as_deref(), query.limit).await?;
    Ok(Json(articles.into_iter().map(Into::into).collect()))
}

// POST /api/news
pub async fn create_news(
    State(state): State<AppState>,
    Json(req): Json<CreateNewsRequest>,
) -> Result<Json<Value>, ApiError> {
    let article = news_service::create(
        &state,
        &req.title,
        &req.content,
        &req.source,
        &req.category,
        req.published_at,
        req.image_url.as_deref(),
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "news_id": article.id,
        "message": "News article created successfully",
    })))
}
