use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::User;
use crate::services::user_service::{self, AccountOverview};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub login: String,
    pub password: String,
    pub server: String,
    #[serde(default = "default_broker")]
    pub broker: String,
    #[serde(default = "default_account_type")]
    pub account_type: String,
    #[serde(default = "default_broker")]
    pub platform: String,
}

fn default_broker() -> String {
    "mt5".to_string()
}

fn default_account_type() -> String {
    "demo".to_string()
}

/// User snapshot without the credential fields.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub broker_account: String,
    pub server: String,
    pub broker: String,
    pub account_type: String,
    pub balance: f64,
    pub equity: f64,
    pub currency: String,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            broker_account: user.broker_account,
            server: user.server,
            broker: user.broker,
            account_type: user.account_type,
            balance: user.balance,
            equity: user.equity,
            currency: user.currency,
            last_login: user.last_login,
        }
    }
}

// POST /api/users/connect
pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<AccountOverview>, ApiError> {
    if req.login.trim().is_empty() || req.password.is_empty() || req.server.trim().is_empty() {
        return Err(ApiError::Validation(
            "login, password and server are required".to_string(),
        ));
    }

    let overview = user_service::connect(
        &state,
        req.login.trim(),
        &req.password,
        req.server.trim(),
        &req.broker,
        &req.account_type,
        &req.platform,
    )
    .await?;

    Ok(Json(overview))
}

// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = user_service::get_user(&state, &user_id).await?;
    Ok(Json(user.into()))
}

// GET /api/users/:id/account
pub async fn get_account(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<AccountOverview>, ApiError> {
    let overview = user_service::live_account(&state, &user_id).await?;
    Ok(Json(overview))
}
