//! Idempotent schema provisioning for the document store. Safe to run on
//! every startup: existing databases, collections and attributes are left
//! alone, and "already exists" answers count as success.

use reqwest::Method;
use serde_json::json;

use super::appwrite::{AppwriteClient, StoreError};

enum Attr {
    Str { size: u32 },
    Double,
    Datetime,
}

struct AttrSpec {
    key: &'static str,
    kind: Attr,
    required: bool,
}

struct CollectionSpec {
    name: &'static str,
    attributes: &'static [AttrSpec],
}

const fn str_attr(key: &'static str, size: u32, required: bool) -> AttrSpec {
    AttrSpec { key, kind: Attr::Str { size }, required }
}

const fn double_attr(key: &'static str, required: bool) -> AttrSpec {
    AttrSpec { key, kind: Attr::Double, required }
}

const fn datetime_attr(key: &'static str, required: bool) -> AttrSpec {
    AttrSpec { key, kind: Attr::Datetime, required }
}

const USERS: &[AttrSpec] = &[
    str_attr("broker_account", 100, true),
    str_attr("encrypted_password", 500, true),
    str_attr("iv", 100, true),
    str_attr("auth_tag", 100, true),
    str_attr("server", 100, true),
    str_attr("broker", 50, true),
    str_attr("account_type", 20, true),
    double_attr("balance", true),
    double_attr("equity", true),
    str_attr("currency", 10, true),
    datetime_attr("last_login", false),
];

const POSITIONS: &[AttrSpec] = &[
    str_attr("user_id", 50, true),
    str_attr("symbol", 20, true),
    str_attr("type", 10, true),
    double_attr("volume", true),
    double_attr("open_price", true),
    double_attr("current_price", true),
    double_attr("stop_loss", false),
    double_attr("take_profit", false),
    double_attr("profit", true),
    str_attr("status", 20, true),
    str_attr("broker_position_id", 100, false),
    datetime_attr("opened_at", true),
    datetime_attr("closed_at", false),
];

const ORDERS: &[AttrSpec] = &[
    str_attr("user_id", 50, true),
    str_attr("symbol", 20, true),
    str_attr("type", 20, true),
    double_attr("volume", true),
    double_attr("price", true),
    double_attr("stop_loss", false),
    double_attr("take_profit", false),
    str_attr("status", 20, true),
    str_attr("broker_order_id", 100, false),
    datetime_attr("created_at", true),
    datetime_attr("executed_at", false),
];

const NEWS: &[AttrSpec] = &[
    str_attr("title", 200, true),
    str_attr("content", 5000, true),
    str_attr("source", 50, true),
    str_attr("category", 50, true),
    datetime_attr("published_at", true),
    str_attr("image_url", 500, false),
];

/// 409 means somebody (a previous run, a concurrent instance) already
/// created the thing; that is the outcome we wanted.
fn tolerate_conflict(result: Result<serde_json::Value, StoreError>) -> Result<(), StoreError> {
    match result {
        Ok(_) => Ok(()),
        Err(StoreError::Status { status: 409, .. }) => Ok(()),
        Err(e) => Err(e),
    }
}

pub async fn ensure_schema(store: &AppwriteClient) -> Result<(), StoreError> {
    ensure_database(store).await?;

    let collections = store.list_collections().await.unwrap_or_default();
    let exists = |id: &str| {
        collections
            .iter()
            .any(|c| c.get("$id").and_then(|v| v.as_str()) == Some(id))
    };

    let specs = [
        (store.users_collection.clone(), CollectionSpec { name: "Users", attributes: USERS }),
        (store.positions_collection.clone(), CollectionSpec { name: "Positions", attributes: POSITIONS }),
        (store.orders_collection.clone(), CollectionSpec { name: "Orders", attributes: ORDERS }),
        (store.news_collection.clone(), CollectionSpec { name: "News", attributes: NEWS }),
    ];

    for (id, spec) in &specs {
        if !exists(id) {
            tracing::info!(collection = %spec.name, "creating collection");
            ensure_collection(store, id, spec.name).await?;
        }
        for attr in spec.attributes {
            ensure_attribute(store, id, attr).await?;
        }
    }

    tracing::info!("document store schema is in place");
    Ok(())
}

async fn ensure_database(store: &AppwriteClient) -> Result<(), StoreError> {
    let databases = store.list_databases().await.unwrap_or_default();
    let exists = databases
        .iter()
        .any(|db| db.get("$id").and_then(|v| v.as_str()) == Some(store.database_id.as_str()));

    if exists {
        return Ok(());
    }

    tracing::info!(database = %store.database_id, "creating database");
    let body = json!({
        "databaseId": store.database_id,
        "name": "TradeDesk Database",
    });
    tolerate_conflict(store.request(Method::POST, "/databases", Some(&body), &[]).await)
}

async fn ensure_collection(
    store: &AppwriteClient,
    collection_id: &str,
    name: &str,
) -> Result<(), StoreError> {
    let path = format!("/databases/{}/collections", store.database_id);
    let body = json!({
        "collectionId": collection_id,
        "name": name,
        "permissions": ["read(\"any\")", "write(\"any\")"],
    });
    tolerate_conflict(store.request(Method::POST, &path, Some(&body), &[]).await)
}

async fn ensure_attribute(
    store: &AppwriteClient,
    collection_id: &str,
    attr: &AttrSpec,
) -> Result<(), StoreError> {
    let (type_segment, body) = match attr.kind {
        Attr::Str { size } => (
            "string",
            json!({ "key": attr.key, "size": size, "required": attr.required }),
        ),
        Attr::Double => (
            "float",
            json!({ "key": attr.key, "required": attr.required }),
        ),
        Attr::Datetime => (
            "datetime",
            json!({ "key": attr.key, "required": attr.required }),
        ),
    };

    let path = format!(
        "/databases/{}/collections/{}/attributes/{}",
        store.database_id, collection_id, type_segment
    );
    tolerate_conflict(store.request(Method::POST, &path, Some(&body), &[]).await)
}
