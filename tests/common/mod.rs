#![allow(dead_code)]

use std::time::Duration;

use http_body_util::BodyExt;
use serde_json::Value;
use tradedesk::config::Settings;
use tradedesk::services::appwrite::AppwriteClient;
use tradedesk::services::crypto::PasswordCipher;
use tradedesk::services::locks::KeyedLocks;
use tradedesk::services::metaapi::MetaApiClient;
use tradedesk::AppState;

pub const TEST_SECRET: &str = "test-operator-secret";

/// Settings pointed at mock servers, with polling tightened so waits finish
/// in milliseconds.
pub fn test_settings(store_url: &str, metaapi_url: &str) -> Settings {
    Settings {
        appwrite_endpoint: store_url.to_string(),
        appwrite_project_id: "test-project".to_string(),
        appwrite_api_key: "test-key".to_string(),
        database_id: "testdb".to_string(),
        users_collection_id: "users".to_string(),
        positions_collection_id: "positions".to_string(),
        orders_collection_id: "orders".to_string(),
        news_collection_id: "news".to_string(),
        metaapi_token: Some("test-token".to_string()),
        metaapi_provisioning_url: metaapi_url.to_string(),
        metaapi_client_url: metaapi_url.to_string(),
        metaapi_region: "new-york".to_string(),
        metaapi_poll_interval: Duration::from_millis(1),
        metaapi_poll_attempts: 5,
        encryption_key: TEST_SECRET.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}

pub fn test_state(settings: Settings) -> AppState {
    let store = AppwriteClient::new(&settings);
    let metaapi = settings
        .metaapi_token
        .clone()
        .map(|token| MetaApiClient::new(token, &settings));

    AppState {
        cipher: PasswordCipher::new(&settings.encryption_key),
        store,
        metaapi,
        connect_locks: KeyedLocks::new(),
        settings,
    }
}

/// State with the trading backend deliberately unconfigured.
pub fn test_state_without_metaapi(settings: Settings) -> AppState {
    let mut settings = settings;
    settings.metaapi_token = None;
    test_state(settings)
}

pub async fn body_json(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn user_doc(id: &str, login: &str, server: &str, balance: f64) -> Value {
    serde_json::json!({
        "$id": id,
        "broker_account": login,
        "encrypted_password": "AAAA",
        "iv": "AAAA",
        "auth_tag": "AAAA",
        "server": server,
        "broker": "mt5",
        "account_type": "demo",
        "balance": balance,
        "equity": balance,
        "currency": "USD",
        "last_login": "2024-01-01T00:00:00.000Z",
    })
}
