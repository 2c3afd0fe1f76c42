mod common;

use serde_json::json;
use tradedesk::error::ApiError;
use tradedesk::services::metaapi::MetaApiClient;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn metaapi(url: &str) -> MetaApiClient {
    let settings = common::test_settings("http://unused.invalid", url);
    MetaApiClient::new("test-token".to_string(), &settings)
}

fn account_record(state: &str, connection_status: &str) -> serde_json::Value {
    json!({
        "_id": "acc-1",
        "login": "100200",
        "server": "Demo-1",
        "state": state,
        "connectionStatus": connection_status,
    })
}

fn account_information() -> serde_json::Value {
    json!({
        "balance": 10000.0,
        "equity": 10050.5,
        "margin": 120.0,
        "freeMargin": 9930.5,
        "currency": "USD",
        "leverage": 100,
    })
}

/// Mounts the full happy-path connect sequence for a fresh account.
async fn mount_connect_sequence(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/users/current/accounts"))
        .and(header("auth-token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/current/accounts"))
        .and(body_partial_json(json!({
            "login": "100200",
            "server": "Demo-1",
            "type": "cloud",
            "platform": "mt5",
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(account_record("UNDEPLOYED", "DISCONNECTED")),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/current/accounts/acc-1/deploy"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/current/accounts/acc-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(account_record("DEPLOYED", "CONNECTED")),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/current/accounts/acc-1/account-information"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_information()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn connect_walks_the_full_sequence_and_returns_the_snapshot() {
    let server = MockServer::start().await;
    mount_connect_sequence(&server).await;

    let client = metaapi(&server.uri());
    let snapshot = client
        .connect_account("100200", "pw", "Demo-1", "mt5")
        .await
        .unwrap();

    assert_eq!(snapshot.balance, 10000.0);
    assert_eq!(snapshot.equity, 10050.5);
    assert_eq!(snapshot.free_margin, 9930.5);
    assert_eq!(snapshot.currency, "USD");
    assert!(client.has_session("100200").await);
}

#[tokio::test]
async fn second_connect_reuses_the_cached_session() {
    let server = MockServer::start().await;
    mount_connect_sequence(&server).await;

    let client = metaapi(&server.uri());
    client.connect_account("100200", "pw", "Demo-1", "mt5").await.unwrap();
    client.connect_account("100200", "pw", "Demo-1", "mt5").await.unwrap();

    // The POST /users/current/accounts mock expects exactly one call; a
    // second full sequence would trip it on drop.
    server.verify().await;
}

#[tokio::test]
async fn concurrent_connects_for_one_login_coalesce() {
    let server = MockServer::start().await;
    mount_connect_sequence(&server).await;

    let client = metaapi(&server.uri());
    let (a, b) = tokio::join!(
        client.connect_account("100200", "pw", "Demo-1", "mt5"),
        client.connect_account("100200", "pw", "Demo-1", "mt5"),
    );
    a.unwrap();
    b.unwrap();

    // Still exactly one account creation.
    server.verify().await;
}

#[tokio::test]
async fn existing_remote_account_is_located_not_recreated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/current/accounts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([account_record("DEPLOYED", "CONNECTED")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/current/accounts"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/current/accounts/acc-1/deploy"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/current/accounts/acc-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(account_record("DEPLOYED", "CONNECTED")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/current/accounts/acc-1/account-information"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_information()))
        .mount(&server)
        .await;

    metaapi(&server.uri())
        .connect_account("100200", "pw", "Demo-1", "mt5")
        .await
        .unwrap();
    server.verify().await;
}

#[tokio::test]
async fn deployment_that_never_completes_times_out_with_a_connection_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/current/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/current/accounts"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(account_record("UNDEPLOYED", "DISCONNECTED")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/current/accounts/acc-1/deploy"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    // Stuck deploying forever.
    Mock::given(method("GET"))
        .and(path("/users/current/accounts/acc-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(account_record("DEPLOYING", "DISCONNECTED")),
        )
        .mount(&server)
        .await;

    let client = metaapi(&server.uri());
    let err = client
        .connect_account("100200", "pw", "Demo-1", "mt5")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Connection(_)));
    // Nothing cached after a failed sequence.
    assert!(!client.has_session("100200").await);
}

#[tokio::test]
async fn operations_without_a_session_fail_as_not_connected() {
    let server = MockServer::start().await;
    let client = metaapi(&server.uri());

    assert!(matches!(
        client.account_info("100200").await,
        Err(ApiError::NotConnected(_))
    ));
    assert!(matches!(
        client.place_trade("100200", "EURUSD", 0.1, "buy", None, None).await,
        Err(ApiError::NotConnected(_))
    ));
    assert!(matches!(
        client.close_position("100200", "12345").await,
        Err(ApiError::NotConnected(_))
    ));
}

#[tokio::test]
async fn place_trade_returns_broker_identifiers_and_fill_price() {
    let server = MockServer::start().await;
    mount_connect_sequence(&server).await;

    Mock::given(method("POST"))
        .and(path("/users/current/accounts/acc-1/trade"))
        .and(body_partial_json(json!({
            "actionType": "ORDER_TYPE_BUY",
            "symbol": "EURUSD",
            "volume": 0.1,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orderId": "46870472",
            "positionId": "46870472",
            "openPrice": 1.0935,
            "numericCode": 10009,
            "stringCode": "TRADE_RETCODE_DONE",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = metaapi(&server.uri());
    client.connect_account("100200", "pw", "Demo-1", "mt5").await.unwrap();

    let result = client
        .place_trade("100200", "EURUSD", 0.1, "buy", None, None)
        .await
        .unwrap();

    assert_eq!(result.order_id.as_deref(), Some("46870472"));
    assert_eq!(result.fill_price(), 1.0935);
}

#[tokio::test]
async fn broker_rejection_is_an_upstream_error_and_keeps_the_session() {
    let server = MockServer::start().await;
    mount_connect_sequence(&server).await;

    Mock::given(method("POST"))
        .and(path("/users/current/accounts/acc-1/trade"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numericCode": 10019,
            "stringCode": "TRADE_RETCODE_NO_MONEY",
            "message": "No money",
        })))
        .mount(&server)
        .await;

    let client = metaapi(&server.uri());
    client.connect_account("100200", "pw", "Demo-1", "mt5").await.unwrap();

    let err = client
        .place_trade("100200", "EURUSD", 100.0, "buy", None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Upstream(_)));
    // A rejected order is not a broken connection.
    assert!(client.has_session("100200").await);
}

#[tokio::test]
async fn failed_operation_evicts_the_session_and_reconnect_runs_the_sequence() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/current/accounts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([account_record("DEPLOYED", "CONNECTED")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/current/accounts/acc-1/deploy"))
        .respond_with(ResponseTemplate::new(204))
        // Once for the first connect, once for the reconnect.
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/current/accounts/acc-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(account_record("DEPLOYED", "CONNECTED")),
        )
        .mount(&server)
        .await;
    // Answers the first connect's synchronization wait, then goes dark.
    Mock::given(method("GET"))
        .and(path("/users/current/accounts/acc-1/account-information"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_information()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/current/accounts/acc-1/account-information"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "connection lost",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Back up for the reconnect.
    Mock::given(method("GET"))
        .and(path("/users/current/accounts/acc-1/account-information"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_information()))
        .mount(&server)
        .await;

    let client = metaapi(&server.uri());
    client.connect_account("100200", "pw", "Demo-1", "mt5").await.unwrap();

    // The live read fails; the session must be evicted, not retried.
    let err = client.account_info("100200").await.unwrap_err();
    assert!(matches!(err, ApiError::Upstream(_)));
    assert!(!client.has_session("100200").await);

    // Reconnect runs the whole sequence again (second deploy call).
    client.connect_account("100200", "pw", "Demo-1", "mt5").await.unwrap();
    assert!(client.has_session("100200").await);
    server.verify().await;
}
