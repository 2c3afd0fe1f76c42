use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::ApiError;
use crate::models::News;
use crate::AppState;

/// Lists news articles, newest first. An empty collection is seeded with
/// placeholder content first so the feed is never blank.
pub async fn list(
    state: &AppState,
    category: Option<&str>,
    limit: i64,
) -> Result<Vec<News>, ApiError> {
    let articles = state.store.list_news(category, limit).await?;
    if !articles.is_empty() {
        return Ok(articles);
    }

    seed_if_empty(state).await?;
    Ok(state.store.list_news(category, limit).await?)
}

pub async fn create(
    state: &AppState,
    title: &str,
    content: &str,
    source: &str,
    category: &str,
    published_at: DateTime<Utc>,
    image_url: Option<&str>,
) -> Result<News, ApiError> {
    let article = state
        .store
        .create_news(json!({
            "title": title,
            "content": content,
            "source": source,
            "category": category,
            "published_at": published_at,
            "image_url": image_url,
        }))
        .await?;
    Ok(article)
}

/// Seeds the sample articles when the collection holds nothing at all.
pub async fn seed_if_empty(state: &AppState) -> Result<(), ApiError> {
    let existing = state.store.list_news(None, 1).await?;
    if !existing.is_empty() {
        return Ok(());
    }

    tracing::info!("seeding sample news articles");

    let samples = [
        json!({
            "title": "TradeDesk Platform Now Live",
            "content": "The TradeDesk platform is now live. Connect your MT5 account to place and track trades from one place.",
            "source": "TradeDesk",
            "category": "platform",
            "published_at": Utc::now(),
            "image_url": null,
        }),
        json!({
            "title": "EUR/USD Technical Analysis",
            "content": "The EUR/USD pair is showing bullish momentum. Key resistance at 1.0900, support at 1.0800.",
            "source": "Technical Analysis",
            "category": "forex",
            "published_at": Utc::now(),
            "image_url": null,
        }),
    ];

    for sample in samples {
        state.store.create_news(sample).await?;
    }
    Ok(())
}
