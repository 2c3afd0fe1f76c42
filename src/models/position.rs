use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "$id")]
    pub id: String,

    pub user_id: String,
    pub symbol: String,

    // "Buy" or "Sell"; the attribute is named `type` in the store.
    #[serde(rename = "type")]
    pub kind: String,

    pub volume: f64,
    pub open_price: f64,
    pub current_price: f64,

    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,

    pub profit: f64,

    // "open" or "closed"
    pub status: String,

    #[serde(default)]
    pub broker_position_id: Option<String>,

    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}
