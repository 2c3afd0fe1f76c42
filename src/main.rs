use std::net::SocketAddr;

use tradedesk::services::appwrite::AppwriteClient;
use tradedesk::services::crypto::PasswordCipher;
use tradedesk::services::locks::KeyedLocks;
use tradedesk::services::metaapi::MetaApiClient;
use tradedesk::services::{news_service, provision};
use tradedesk::{config, routes, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    let store = AppwriteClient::new(&settings);

    // Idempotent; a store that is down at boot only costs a warning here.
    if let Err(e) = provision::ensure_schema(&store).await {
        tracing::warn!(error = %e, "schema provisioning failed, continuing");
    }

    let metaapi = settings
        .metaapi_token
        .clone()
        .map(|token| MetaApiClient::new(token, &settings));
    if metaapi.is_none() {
        tracing::warn!("METAAPI_TOKEN not set, trading endpoints will answer 503");
    }

    let state = AppState {
        cipher: PasswordCipher::new(&settings.encryption_key),
        store,
        metaapi,
        connect_locks: KeyedLocks::new(),
        settings: settings.clone(),
    };

    if let Err(e) = news_service::seed_if_empty(&state).await {
        tracing::warn!(error = %e, "could not seed sample news");
    }

    let app = routes::app(state);

    let addr = SocketAddr::from((
        settings.host.parse::<std::net::IpAddr>().unwrap(),
        settings.port,
    ));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
