use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;
use crate::models::User;
use crate::AppState;

/// Account snapshot returned by connect and by the live-account endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AccountOverview {
    pub user_id: String,
    pub broker_account: String,
    pub server: String,
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub free_margin: f64,
    pub currency: String,
}

/// Connects a broker account: reuses (or creates) the user document, runs
/// the session connect sequence and writes the fresh balance back.
///
/// Single-flighted on (login, server) so two concurrent first connects
/// cannot both miss the lookup and create duplicate user documents.
pub async fn connect(
    state: &AppState,
    login: &str,
    password: &str,
    server: &str,
    broker: &str,
    account_type: &str,
    platform: &str,
) -> Result<AccountOverview, ApiError> {
    let Some(metaapi) = state.metaapi.as_ref() else {
        return Err(ApiError::Configuration(
            "trading backend not configured; set METAAPI_TOKEN".to_string(),
        ));
    };

    let key = format!("{login}|{server}");
    let slot = state.connect_locks.entry(&key).await;
    let _guard = slot.lock().await;

    let (user_id, broker_password) = match state.store.find_user(login, server).await? {
        Some(user) => {
            tracing::info!(user_id = %user.id, login, "existing user found");
            let password = match state
                .cipher
                .decrypt(&user.encrypted_password, &user.iv, &user.auth_tag)
            {
                Ok(p) => p,
                Err(e) => {
                    // A changed operator secret makes old credentials
                    // unreadable; the freshly submitted password still works.
                    tracing::warn!(user_id = %user.id, error = %e, "could not decrypt stored password, using submitted one");
                    password.to_string()
                }
            };
            (user.id, password)
        }
        None => {
            let encrypted = state.cipher.encrypt(password)?;
            let user = state
                .store
                .create_user(json!({
                    "broker_account": login,
                    "encrypted_password": encrypted.ciphertext,
                    "iv": encrypted.nonce,
                    "auth_tag": encrypted.tag,
                    "server": server,
                    "broker": broker,
                    "account_type": account_type,
                    "balance": 0.0,
                    "equity": 0.0,
                    "currency": "USD",
                    "last_login": Utc::now(),
                }))
                .await?;
            tracing::info!(user_id = %user.id, login, "new user created");
            (user.id, password.to_string())
        }
    };

    let snapshot = metaapi
        .connect_account(login, &broker_password, server, platform)
        .await?;

    state
        .store
        .update_user(
            &user_id,
            json!({
                "balance": snapshot.balance,
                "equity": snapshot.equity,
                "last_login": Utc::now(),
            }),
        )
        .await?;

    Ok(AccountOverview {
        user_id,
        broker_account: login.to_string(),
        server: server.to_string(),
        balance: snapshot.balance,
        equity: snapshot.equity,
        margin: snapshot.margin,
        free_margin: snapshot.free_margin,
        currency: snapshot.currency,
    })
}

pub async fn get_user(state: &AppState, user_id: &str) -> Result<User, ApiError> {
    state
        .store
        .get_user(user_id)
        .await
        .map_err(ApiError::entity("user"))
}

/// Live snapshot with write-through. When the trading backend cannot answer,
/// the last persisted balance/equity is served instead of an error.
pub async fn live_account(state: &AppState, user_id: &str) -> Result<AccountOverview, ApiError> {
    let user = get_user(state, user_id).await?;

    let Some(metaapi) = state.metaapi.as_ref() else {
        return Err(ApiError::Configuration(
            "trading backend not configured".to_string(),
        ));
    };

    match metaapi.account_info(&user.broker_account).await {
        Ok(snapshot) => {
            // Best-effort write-through; a persist failure must not turn a
            // successful read into an error.
            if let Err(e) = state
                .store
                .update_user(
                    &user.id,
                    json!({ "balance": snapshot.balance, "equity": snapshot.equity }),
                )
                .await
            {
                tracing::warn!(user_id = %user.id, error = %e, "could not persist fresh balance");
            }

            Ok(AccountOverview {
                user_id: user.id,
                broker_account: user.broker_account,
                server: user.server,
                balance: snapshot.balance,
                equity: snapshot.equity,
                margin: snapshot.margin,
                free_margin: snapshot.free_margin,
                currency: snapshot.currency,
            })
        }
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "live account lookup failed, serving cached values");
            Ok(AccountOverview {
                user_id: user.id,
                broker_account: user.broker_account,
                server: user.server,
                balance: user.balance,
                equity: user.equity,
                margin: 0.0,
                free_margin: 0.0,
                currency: user.currency,
            })
        }
    }
}
