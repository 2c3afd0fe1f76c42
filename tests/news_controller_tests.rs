mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;
use tradedesk::routes;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn article(id: &str, title: &str, category: &str) -> serde_json::Value {
    json!({
        "$id": id,
        "title": title,
        "content": "content",
        "source": "TradeDesk",
        "category": category,
        "published_at": "2024-01-01T00:00:00.000Z",
        "image_url": null,
    })
}

#[tokio::test]
async fn news_list_returns_stored_articles() {
    let store = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases/testdb/collections/news/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 2,
            "documents": [
                article("n2", "Second", "forex"),
                article("n1", "First", "platform"),
            ],
        })))
        .mount(&store)
        .await;

    let settings = common::test_settings(&store.uri(), "http://unused.invalid");
    let app = routes::app(common::test_state_without_metaapi(settings));

    let res = app
        .oneshot(Request::builder().uri("/api/news").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = common::body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["id"], "n2");
    assert_eq!(body[0]["title"], "Second");
}

#[tokio::test]
async fn news_category_filter_is_passed_through() {
    let store = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases/testdb/collections/news/documents"))
        .and(query_param("queries[]", r#"equal("category", ["forex"])"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "documents": [article("n2", "Second", "forex")],
        })))
        .expect(1)
        .mount(&store)
        .await;

    let settings = common::test_settings(&store.uri(), "http://unused.invalid");
    let app = routes::app(common::test_state_without_metaapi(settings));

    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/news?category=forex")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    store.verify().await;
}

/// An empty collection is seeded with the sample articles, then re-listed.
#[tokio::test]
async fn news_list_seeds_an_empty_collection() {
    let store = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/databases/testdb/collections/news/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 0,
            "documents": [],
        })))
        .up_to_n_times(2)
        .mount(&store)
        .await;
    Mock::given(method("POST"))
        .and(path("/databases/testdb/collections/news/documents"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(article("seeded", "TradeDesk Platform Now Live", "platform")),
        )
        .expect(2)
        .mount(&store)
        .await;
    Mock::given(method("GET"))
        .and(path("/databases/testdb/collections/news/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 2,
            "documents": [
                article("s1", "TradeDesk Platform Now Live", "platform"),
                article("s2", "EUR/USD Technical Analysis", "forex"),
            ],
        })))
        .mount(&store)
        .await;

    let settings = common::test_settings(&store.uri(), "http://unused.invalid");
    let app = routes::app(common::test_state_without_metaapi(settings));

    let res = app
        .oneshot(Request::builder().uri("/api/news").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = common::body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    store.verify().await;
}

#[tokio::test]
async fn create_news_persists_the_article() {
    let store = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/databases/testdb/collections/news/documents"))
        .and(body_partial_json(json!({
            "data": {
                "title": "Fed Holds Rates",
                "source": "Reuters",
                "category": "macro",
            },
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(article("n9", "Fed Holds Rates", "macro")),
        )
        .expect(1)
        .mount(&store)
        .await;

    let settings = common::test_settings(&store.uri(), "http://unused.invalid");
    let app = routes::app(common::test_state_without_metaapi(settings));

    let req = Request::builder()
        .method("POST")
        .uri("/api/news")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "title": "Fed Holds Rates",
                "content": "The Federal Reserve held rates steady.",
                "source": "Reuters",
                "category": "macro",
            })
            .to_string(),
        ))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = common::body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["news_id"], "n9");
    store.verify().await;
}
