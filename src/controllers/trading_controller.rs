use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{Order, Position};
use crate::services::trading_service::{self, CloseReceipt, TradeReceipt};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub user_id: String,
    pub symbol: String,
    pub volume: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ClosePositionRequest {
    pub user_id: String,
    pub position_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PositionsQuery {
    #[serde(default = "default_position_status")]
    pub status: String,
}

fn default_position_status() -> String {
    "open".to_string()
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    #[serde(default = "default_order_status")]
    pub status: String,
}

fn default_order_status() -> String {
    "pending".to_string()
}

#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub volume: f64,
    pub open_price: f64,
    pub current_price: f64,
    pub profit: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub status: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<Position> for PositionResponse {
    fn from(p: Position) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            symbol: p.symbol,
            kind: p.kind,
            volume: p.volume,
            open_price: p.open_price,
            current_price: p.current_price,
            profit: p.profit,
            stop_loss: p.stop_loss,
            take_profit: p.take_profit,
            status: p.status,
            opened_at: p.opened_at,
            closed_at: p.closed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub volume: f64,
    pub price: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            user_id: o.user_id,
            symbol: o.symbol,
            kind: o.kind,
            volume: o.volume,
            price: o.price,
            status: o.status,
            created_at: o.created_at,
            executed_at: o.executed_at,
        }
    }
}

// POST /api/trade
pub async fn place_trade(
    State(state): State<AppState>,
    Json(req): Json<TradeRequest>,
) -> Result<Json<TradeReceipt>, ApiError> {
    let receipt = trading_service::place_trade(
        &state,
        &req.user_id,
        &req.symbol,
        req.volume,
        &req.kind,
        req.stop_loss,
        req.take_profit,
    )
    .await?;
    Ok(Json(receipt))
}

// GET /api/users/:id/positions?status=open|closed
pub async fn get_positions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PositionsQuery>,
) -> Result<Json<Vec<PositionResponse>>, ApiError> {
    let positions = trading_service::positions(&state, &user_id, &query.status).await?;
    Ok(Json(positions.into_iter().map(Into::into).collect()))
}

// POST /api/positions/close
pub async fn close_position(
    State(state): State<AppState>,
    Json(req): Json<ClosePositionRequest>,
) -> Result<Json<CloseReceipt>, ApiError> {
    let receipt =
        trading_service::close_position(&state, &req.user_id, &req.position_id).await?;
    Ok(Json(receipt))
}

// GET /api/users/:id/orders?status=pending|executed
pub async fn get_orders(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = trading_service::orders(&state, &user_id, &query.status).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}
