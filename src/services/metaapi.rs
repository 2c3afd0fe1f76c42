//! Session manager and execution facade for the MetaApi trading backend.
//!
//! Connecting an account walks the full provisioning sequence (locate or
//! create the remote record, deploy, wait deployed, wait broker-connected,
//! wait for terminal synchronization) and caches the resulting session
//! under the broker login. Connects for one login are single-flighted
//! through a per-key lock, so concurrent requests coalesce instead of each
//! running the sequence and overwriting the other's cache entry.
//!
//! A cached session has no background liveness check. If an operation
//! against it fails, the entry is evicted and the next connect re-runs the
//! sequence from the top.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::Settings;
use crate::error::ApiError;

use super::locks::KeyedLocks;

/// MT5 retcode for a completed trade.
const TRADE_RETCODE_DONE: i64 = 10009;

#[derive(Debug, Clone)]
struct Session {
    /// MetaApi account id, not the broker login.
    account_id: String,
}

#[derive(Clone)]
pub struct MetaApiClient {
    http: Client,
    token: String,
    provisioning_url: String,
    client_url: String,
    region: String,
    poll_interval: Duration,
    poll_attempts: u32,
    sessions: KeyedLocks<Option<Session>>,
}

/// Remote account record from the provisioning API.
#[derive(Debug, Deserialize)]
struct ProvisionedAccount {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    login: String,
    #[serde(default)]
    server: String,
    #[serde(default)]
    state: String,
    #[serde(rename = "connectionStatus", default)]
    connection_status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub balance: f64,
    pub equity: f64,
    #[serde(default)]
    pub margin: f64,
    #[serde(default)]
    pub free_margin: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_leverage")]
    pub leverage: i64,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_leverage() -> i64 {
    100
}

/// Broker-side view of an open position.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerPosition {
    pub id: String,
    pub symbol: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub volume: f64,
    #[serde(default)]
    pub open_price: f64,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub profit: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResult {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub position_id: Option<String>,
    #[serde(default)]
    pub open_price: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub close_price: Option<f64>,
    #[serde(default)]
    pub profit: Option<f64>,
    #[serde(default)]
    pub numeric_code: Option<i64>,
    #[serde(default)]
    pub string_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TradeResult {
    pub fn fill_price(&self) -> f64 {
        self.open_price.or(self.price).unwrap_or(0.0)
    }
}

impl MetaApiClient {
    pub fn new(token: String, settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            token,
            provisioning_url: settings.metaapi_provisioning_url.clone(),
            client_url: settings.metaapi_client_url.clone(),
            region: settings.metaapi_region.clone(),
            poll_interval: settings.metaapi_poll_interval,
            poll_attempts: settings.metaapi_poll_attempts,
            sessions: KeyedLocks::new(),
        }
    }

    // ---- low-level HTTP ----

    async fn call_raw(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value), String> {
        let mut req = self
            .http
            .request(method, &url)
            .header("auth-token", &self.token);
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await.map_err(|e| e.to_string())?;
        let status = res.status();
        let bytes = res.bytes().await.map_err(|e| e.to_string())?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok((status, value))
    }

    async fn call(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
    ) -> Result<Value, String> {
        let (status, value) = self.call_raw(method, url, body).await?;
        if !status.is_success() {
            let message = value
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("no message")
                .to_string();
            return Err(format!("{}: {message}", status.as_u16()));
        }
        Ok(value)
    }

    fn provisioning(&self, path: &str) -> String {
        format!("{}/users/current/accounts{path}", self.provisioning_url)
    }

    fn client_api(&self, account_id: &str, path: &str) -> String {
        format!("{}/users/current/accounts/{account_id}{path}", self.client_url)
    }

    // ---- connect sequence ----

    /// Runs (or reuses) the account connect sequence and returns the live
    /// account snapshot. Single-flighted per login.
    pub async fn connect_account(
        &self,
        login: &str,
        password: &str,
        server: &str,
        platform: &str,
    ) -> Result<AccountSnapshot, ApiError> {
        let slot = self.sessions.entry(login).await;
        let mut slot = slot.lock().await;

        if let Some(session) = slot.as_ref() {
            // Cached session: reuse it unless it no longer answers.
            match self.fetch_account_information(&session.account_id).await {
                Ok(snapshot) => {
                    tracing::debug!(login, "reusing cached session");
                    return Ok(snapshot);
                }
                Err(e) => {
                    tracing::warn!(login, error = %e, "cached session is broken, reconnecting");
                    *slot = None;
                }
            }
        }

        tracing::info!(login, server, "connecting trading account");

        let account = self
            .locate_or_create(login, password, server, platform)
            .await
            .map_err(ApiError::Connection)?;

        self.deploy(&account.id).await.map_err(ApiError::Connection)?;
        self.wait_deployed(&account.id).await?;
        self.wait_connected(&account.id).await?;
        let snapshot = self.wait_synchronized(&account.id).await?;

        tracing::info!(
            login,
            balance = snapshot.balance,
            equity = snapshot.equity,
            currency = %snapshot.currency,
            "trading account ready"
        );

        *slot = Some(Session {
            account_id: account.id,
        });
        Ok(snapshot)
    }

    async fn locate_or_create(
        &self,
        login: &str,
        password: &str,
        server: &str,
        platform: &str,
    ) -> Result<ProvisionedAccount, String> {
        let listed = self
            .call(Method::GET, self.provisioning(""), None)
            .await?;
        let accounts: Vec<ProvisionedAccount> =
            serde_json::from_value(listed).map_err(|e| format!("bad account list: {e}"))?;

        if let Some(account) = accounts
            .into_iter()
            .find(|a| a.login == login && a.server == server)
        {
            tracing::debug!(login, account_id = %account.id, "found existing remote account");
            return Ok(account);
        }

        tracing::info!(login, "creating remote account record");
        let body = json!({
            "name": format!("TradeDesk_{login}"),
            "type": "cloud",
            "login": login,
            "password": password,
            "server": server,
            "platform": platform,
            "application": "TradeDesk",
            "magic": 123456,
            "region": self.region,
        });
        let created = self
            .call(Method::POST, self.provisioning(""), Some(&body))
            .await?;

        serde_json::from_value(created).map_err(|e| format!("bad create-account response: {e}"))
    }

    /// Idempotent on the remote side when the account is already deployed.
    async fn deploy(&self, account_id: &str) -> Result<(), String> {
        self.call(
            Method::POST,
            self.provisioning(&format!("/{account_id}/deploy")),
            None,
        )
        .await?;
        Ok(())
    }

    async fn fetch_account(&self, account_id: &str) -> Result<ProvisionedAccount, String> {
        let v = self
            .call(Method::GET, self.provisioning(&format!("/{account_id}")), None)
            .await?;
        serde_json::from_value(v).map_err(|e| format!("bad account record: {e}"))
    }

    async fn wait_deployed(&self, account_id: &str) -> Result<(), ApiError> {
        self.poll("deployment", || async move {
            Ok(self.fetch_account(account_id).await?.state == "DEPLOYED")
        })
        .await
    }

    async fn wait_connected(&self, account_id: &str) -> Result<(), ApiError> {
        self.poll("broker connectivity", || async move {
            Ok(self.fetch_account(account_id).await?.connection_status == "CONNECTED")
        })
        .await
    }

    /// The client API only serves account state once the terminal has
    /// finished synchronizing, so a successful read doubles as the
    /// synchronization signal.
    async fn wait_synchronized(&self, account_id: &str) -> Result<AccountSnapshot, ApiError> {
        for _ in 0..self.poll_attempts {
            let (status, value) = self
                .call_raw(
                    Method::GET,
                    self.client_api(account_id, "/account-information"),
                    None,
                )
                .await
                .map_err(ApiError::Connection)?;

            if status.is_success() {
                let snapshot = serde_json::from_value(value)
                    .map_err(|e| ApiError::Connection(format!("bad account information: {e}")))?;
                return Ok(snapshot);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(ApiError::Connection(
            "timed out waiting for synchronization".to_string(),
        ))
    }

    async fn poll<F, Fut>(&self, what: &str, mut check: F) -> Result<(), ApiError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<bool, String>>,
    {
        for _ in 0..self.poll_attempts {
            if check().await.map_err(ApiError::Connection)? {
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(ApiError::Connection(format!("timed out waiting for {what}")))
    }

    // ---- execution facade ----
    //
    // Each operation requires a cached session and does not retry. A failure
    // evicts the session (Ready -> Broken); recovery is the next connect.

    async fn with_session<T, F, Fut>(&self, login: &str, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(String) -> Fut,
        Fut: std::future::Future<Output = Result<T, String>>,
    {
        let slot = self.sessions.entry(login).await;
        let mut slot = slot.lock().await;

        let Some(session) = slot.as_ref() else {
            return Err(ApiError::NotConnected(login.to_string()));
        };

        match op(session.account_id.clone()).await {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(login, error = %e, "session operation failed, evicting session");
                *slot = None;
                Err(ApiError::Upstream(e))
            }
        }
    }

    pub async fn account_info(&self, login: &str) -> Result<AccountSnapshot, ApiError> {
        self.with_session(login, |account_id| async move {
            self.fetch_account_information(&account_id).await
        })
        .await
    }

    async fn fetch_account_information(&self, account_id: &str) -> Result<AccountSnapshot, String> {
        let v = self
            .call(
                Method::GET,
                self.client_api(account_id, "/account-information"),
                None,
            )
            .await?;
        serde_json::from_value(v).map_err(|e| format!("bad account information: {e}"))
    }

    pub async fn get_positions(&self, login: &str) -> Result<Vec<BrokerPosition>, ApiError> {
        self.with_session(login, |account_id| async move {
            let v = self
                .call(Method::GET, self.client_api(&account_id, "/positions"), None)
                .await?;
            serde_json::from_value(v).map_err(|e| format!("bad positions response: {e}"))
        })
        .await
    }

    pub async fn place_trade(
        &self,
        login: &str,
        symbol: &str,
        volume: f64,
        side: &str,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> Result<TradeResult, ApiError> {
        let action_type = if side.eq_ignore_ascii_case("buy") {
            "ORDER_TYPE_BUY"
        } else {
            "ORDER_TYPE_SELL"
        };

        let mut body = Map::new();
        body.insert("actionType".into(), action_type.into());
        body.insert("symbol".into(), symbol.into());
        body.insert("volume".into(), volume.into());
        if let Some(sl) = stop_loss {
            body.insert("stopLoss".into(), sl.into());
        }
        if let Some(tp) = take_profit {
            body.insert("takeProfit".into(), tp.into());
        }

        tracing::info!(login, symbol, volume, side, "executing market order");
        self.trade(login, Value::Object(body)).await
    }

    pub async fn close_position(
        &self,
        login: &str,
        broker_position_id: &str,
    ) -> Result<TradeResult, ApiError> {
        let body = json!({
            "actionType": "POSITION_CLOSE_ID",
            "positionId": broker_position_id,
        });
        tracing::info!(login, broker_position_id, "closing position");
        self.trade(login, body).await
    }

    async fn trade(&self, login: &str, body: Value) -> Result<TradeResult, ApiError> {
        let result = self
            .with_session(login, |account_id| async move {
                let v = self
                    .call(Method::POST, self.client_api(&account_id, "/trade"), Some(&body))
                    .await?;
                serde_json::from_value::<TradeResult>(v)
                    .map_err(|e| format!("bad trade response: {e}"))
            })
            .await?;

        // The trade endpoint answers 200 even for broker rejections; the
        // retcode carries the verdict.
        if let Some(code) = result.numeric_code {
            if code != TRADE_RETCODE_DONE {
                let reason = result
                    .message
                    .or(result.string_code)
                    .unwrap_or_else(|| format!("retcode {code}"));
                return Err(ApiError::Upstream(format!("trade rejected: {reason}")));
            }
        }
        Ok(result)
    }

    /// Whether a `Ready` session is cached for this login.
    pub async fn has_session(&self, login: &str) -> bool {
        self.sessions.entry(login).await.lock().await.is_some()
    }
}
