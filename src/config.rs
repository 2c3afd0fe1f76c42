use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub appwrite_endpoint: String,
    pub appwrite_project_id: String,
    pub appwrite_api_key: String,

    pub database_id: String,
    pub users_collection_id: String,
    pub positions_collection_id: String,
    pub orders_collection_id: String,
    pub news_collection_id: String,

    // Broker backend. Token is optional: without it the server still serves
    // cached reads, and trading endpoints answer 503.
    pub metaapi_token: Option<String>,
    pub metaapi_provisioning_url: String,
    pub metaapi_client_url: String,
    pub metaapi_region: String,

    /// Poll cadence for the deploy/connect/synchronize waits.
    pub metaapi_poll_interval: Duration,
    /// Upper bound on polls per wait before the connect attempt is abandoned.
    pub metaapi_poll_attempts: u32,

    pub encryption_key: String,

    pub host: String,
    pub port: u16,
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let appwrite_endpoint = env::var("APPWRITE_ENDPOINT")
        .unwrap_or_else(|_| "https://cloud.appwrite.io/v1".to_string());
    let appwrite_project_id = env::var("APPWRITE_PROJECT_ID").unwrap_or_default();
    let appwrite_api_key = env::var("APPWRITE_API_KEY").unwrap_or_default();

    let database_id =
        env::var("APPWRITE_DATABASE_ID").unwrap_or_else(|_| "tradedesk_db".to_string());
    let users_collection_id =
        env::var("APPWRITE_USERS_COLLECTION_ID").unwrap_or_else(|_| "users".to_string());
    let positions_collection_id =
        env::var("APPWRITE_POSITIONS_COLLECTION_ID").unwrap_or_else(|_| "positions".to_string());
    let orders_collection_id =
        env::var("APPWRITE_ORDERS_COLLECTION_ID").unwrap_or_else(|_| "orders".to_string());
    let news_collection_id =
        env::var("APPWRITE_NEWS_COLLECTION_ID").unwrap_or_else(|_| "news".to_string());

    let metaapi_token = env::var("METAAPI_TOKEN").ok().filter(|t| !t.trim().is_empty());

    let metaapi_provisioning_url = env::var("METAAPI_PROVISIONING_URL").unwrap_or_else(|_| {
        "https://mt-provisioning-api-v1.agiliumtrade.agiliumtrade.ai".to_string()
    });
    let metaapi_region = env::var("METAAPI_REGION").unwrap_or_else(|_| "new-york".to_string());
    let metaapi_client_url = env::var("METAAPI_CLIENT_URL").unwrap_or_else(|_| {
        format!("https://mt-client-api-v1.{metaapi_region}.agiliumtrade.ai")
    });

    let metaapi_poll_interval = env::var("METAAPI_POLL_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_secs(2));

    let metaapi_poll_attempts = env::var("METAAPI_POLL_ATTEMPTS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(150);

    let encryption_key = env::var("ENCRYPTION_KEY")
        .unwrap_or_else(|_| "change-me-dev-secret-32-chars-min!".to_string());

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8000);

    Settings {
        appwrite_endpoint,
        appwrite_project_id,
        appwrite_api_key,
        database_id,
        users_collection_id,
        positions_collection_id,
        orders_collection_id,
        news_collection_id,
        metaapi_token,
        metaapi_provisioning_url,
        metaapi_client_url,
        metaapi_region,
        metaapi_poll_interval,
        metaapi_poll_attempts,
        encryption_key,
        host,
        port,
    }
}
