use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;
use crate::models::{Order, Position};
use crate::AppState;

use super::metaapi::MetaApiClient;
use super::user_service;

#[derive(Debug, Clone, Serialize)]
pub struct TradeReceipt {
    pub success: bool,
    pub position_id: String,
    pub broker_order_id: Option<String>,
    pub broker_position_id: Option<String>,
    pub symbol: String,
    pub volume: f64,
    pub price: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseReceipt {
    pub success: bool,
    pub message: String,
    pub position_id: String,
    pub profit: f64,
}

fn require_metaapi(state: &AppState) -> Result<&MetaApiClient, ApiError> {
    state.metaapi.as_ref().ok_or_else(|| {
        ApiError::Configuration("trading backend not configured; set METAAPI_TOKEN".to_string())
    })
}

fn title_case(side: &str) -> String {
    let mut chars = side.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// Executes a market order for the user's connected account and persists the
/// resulting open position. Execution that succeeds upstream but fails to
/// persist is reported as a hard failure; there is no reconciliation.
pub async fn place_trade(
    state: &AppState,
    user_id: &str,
    symbol: &str,
    volume: f64,
    side: &str,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
) -> Result<TradeReceipt, ApiError> {
    let metaapi = require_metaapi(state)?;

    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::Validation("missing symbol".to_string()));
    }
    if volume <= 0.0 {
        return Err(ApiError::Validation("volume must be positive".to_string()));
    }
    if !side.eq_ignore_ascii_case("buy") && !side.eq_ignore_ascii_case("sell") {
        return Err(ApiError::Validation(format!(
            "type must be \"buy\" or \"sell\", got \"{side}\""
        )));
    }

    let user = user_service::get_user(state, user_id).await?;

    let result = metaapi
        .place_trade(
            &user.broker_account,
            &symbol,
            volume,
            side,
            stop_loss,
            take_profit,
        )
        .await?;

    let fill_price = result.fill_price();
    let broker_position_id = result
        .position_id
        .clone()
        .or_else(|| result.order_id.clone())
        .unwrap_or_default();

    let position = state
        .store
        .create_position(json!({
            "user_id": user_id,
            "symbol": symbol,
            "type": title_case(side),
            "volume": volume,
            "open_price": fill_price,
            "current_price": fill_price,
            "stop_loss": stop_loss,
            "take_profit": take_profit,
            "profit": 0.0,
            "status": "open",
            "broker_position_id": broker_position_id,
            "opened_at": Utc::now(),
        }))
        .await?;

    tracing::info!(
        user_id,
        symbol = %position.symbol,
        position_id = %position.id,
        fill_price,
        "trade executed"
    );

    Ok(TradeReceipt {
        success: true,
        position_id: position.id,
        broker_order_id: result.order_id,
        broker_position_id: result.position_id,
        symbol: position.symbol,
        volume,
        price: fill_price,
        message: format!("{} order executed successfully", side.to_uppercase()),
    })
}

/// Closes a position on the broker and marks the document closed with the
/// realized profit and close price.
pub async fn close_position(
    state: &AppState,
    user_id: &str,
    position_id: &str,
) -> Result<CloseReceipt, ApiError> {
    let metaapi = require_metaapi(state)?;

    let position = state
        .store
        .get_position(position_id)
        .await
        .map_err(ApiError::entity("position"))?;
    let user = user_service::get_user(state, user_id).await?;

    let broker_position_id = position.broker_position_id.clone().ok_or_else(|| {
        ApiError::Validation("position has no broker position id".to_string())
    })?;

    let result = metaapi
        .close_position(&user.broker_account, &broker_position_id)
        .await?;

    let profit = result.profit.unwrap_or(0.0);
    let close_price = result.close_price.unwrap_or(position.current_price);

    state
        .store
        .update_position(
            position_id,
            json!({
                "current_price": close_price,
                "profit": profit,
                "status": "closed",
                "closed_at": Utc::now(),
            }),
        )
        .await?;

    tracing::info!(user_id, position_id, profit, "position closed");

    Ok(CloseReceipt {
        success: true,
        message: "Position closed successfully".to_string(),
        position_id: position_id.to_string(),
        profit,
    })
}

/// Lists the user's positions. For open positions with a live session this
/// also refreshes current price and running profit from the broker, matched
/// by broker position id; a failed refresh is logged and ignored.
pub async fn positions(
    state: &AppState,
    user_id: &str,
    status: &str,
) -> Result<Vec<Position>, ApiError> {
    let mut positions = state.store.positions_for(user_id, Some(status)).await?;

    if status == "open" {
        if let Err(e) = sync_open_positions(state, user_id, &mut positions).await {
            tracing::warn!(user_id, error = %e, "could not sync open positions");
        }
    }

    Ok(positions)
}

async fn sync_open_positions(
    state: &AppState,
    user_id: &str,
    positions: &mut [Position],
) -> Result<(), ApiError> {
    let Some(metaapi) = state.metaapi.as_ref() else {
        return Ok(());
    };
    let user = user_service::get_user(state, user_id).await?;
    if !metaapi.has_session(&user.broker_account).await {
        return Ok(());
    }

    let live = metaapi.get_positions(&user.broker_account).await?;

    for position in positions.iter_mut() {
        let Some(broker_id) = position.broker_position_id.as_deref() else {
            continue;
        };
        let Some(fresh) = live.iter().find(|p| p.id == broker_id) else {
            continue;
        };

        position.current_price = fresh.current_price;
        position.profit = fresh.profit;

        if let Err(e) = state
            .store
            .update_position(
                &position.id,
                json!({
                    "current_price": fresh.current_price,
                    "profit": fresh.profit,
                }),
            )
            .await
        {
            tracing::warn!(position_id = %position.id, error = %e, "could not persist synced position");
        }
    }
    Ok(())
}

pub async fn orders(
    state: &AppState,
    user_id: &str,
    status: &str,
) -> Result<Vec<Order>, ApiError> {
    Ok(state.store.orders_for(user_id, Some(status)).await?)
}
