use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct News {
    #[serde(rename = "$id")]
    pub id: String,

    pub title: String,
    pub content: String,
    pub source: String,
    pub category: String,

    pub published_at: DateTime<Utc>,

    #[serde(default)]
    pub image_url: Option<String>,
}
