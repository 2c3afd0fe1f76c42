use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "$id")]
    pub id: String,

    pub user_id: String,
    pub symbol: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub volume: f64,
    pub price: f64,

    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,

    // pending -> executed
    pub status: String,

    #[serde(default)]
    pub broker_order_id: Option<String>,

    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub executed_at: Option<DateTime<Utc>>,
}
