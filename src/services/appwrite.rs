use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::config::Settings;
use crate::models::{News, Order, Position, User};

/// What a store call can fail with. `NotFound` is a distinct case so callers
/// never have to guess "absent" from a transport failure or an empty list.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// REST client for the Appwrite document database. All durable state lives
/// behind this type; the rest of the crate only sees typed documents.
#[derive(Clone)]
pub struct AppwriteClient {
    http: Client,
    endpoint: String,
    project_id: String,
    api_key: String,

    pub database_id: String,
    pub(crate) users_collection: String,
    pub(crate) positions_collection: String,
    pub(crate) orders_collection: String,
    pub(crate) news_collection: String,
}

#[derive(Debug, serde::Deserialize)]
struct DocumentList<T> {
    #[serde(default = "Vec::new")]
    documents: Vec<T>,
}

// Appwrite query strings, e.g. `equal("server", ["Demo-1"])`.
pub(crate) fn q_equal(field: &str, value: &str) -> String {
    format!(r#"equal("{field}", ["{value}"])"#)
}

pub(crate) fn q_order_desc(field: &str) -> String {
    format!(r#"orderDesc("{field}")"#)
}

pub(crate) fn q_limit(limit: i64) -> String {
    format!("limit({limit})")
}

impl AppwriteClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            endpoint: settings.appwrite_endpoint.clone(),
            project_id: settings.appwrite_project_id.clone(),
            api_key: settings.appwrite_api_key.clone(),
            database_id: settings.database_id.clone(),
            users_collection: settings.users_collection_id.clone(),
            positions_collection: settings.positions_collection_id.clone(),
            orders_collection: settings.orders_collection_id.clone(),
            news_collection: settings.news_collection_id.clone(),
        }
    }

    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        queries: &[String],
    ) -> Result<Value, StoreError> {
        let url = format!("{}{}", self.endpoint, path);

        let mut req = self
            .http
            .request(method, &url)
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key);

        for q in queries {
            req = req.query(&[("queries[]", q)]);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            return Err(StoreError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    // ---- generic document operations ----

    fn documents_path(&self, collection: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.database_id, collection
        )
    }

    fn document_path(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.documents_path(collection), id)
    }

    async fn create_document<T: DeserializeOwned>(
        &self,
        collection: &str,
        data: Value,
    ) -> Result<T, StoreError> {
        let body = json!({ "documentId": "unique()", "data": data });
        let doc = self
            .request(Method::POST, &self.documents_path(collection), Some(&body), &[])
            .await?;
        Ok(serde_json::from_value(doc)?)
    }

    async fn get_document<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<T, StoreError> {
        let doc = self
            .request(Method::GET, &self.document_path(collection, id), None, &[])
            .await?;
        Ok(serde_json::from_value(doc)?)
    }

    async fn list_documents<T: DeserializeOwned>(
        &self,
        collection: &str,
        queries: &[String],
    ) -> Result<Vec<T>, StoreError> {
        let v = self
            .request(Method::GET, &self.documents_path(collection), None, queries)
            .await?;
        let list: DocumentList<T> = serde_json::from_value(v)?;
        Ok(list.documents)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> Result<Value, StoreError> {
        let body = json!({ "data": data });
        self.request(
            Method::PATCH,
            &self.document_path(collection, id),
            Some(&body),
            &[],
        )
        .await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.request(Method::DELETE, &self.document_path(collection, id), None, &[])
            .await?;
        Ok(())
    }

    // ---- users ----

    pub async fn create_user(&self, data: Value) -> Result<User, StoreError> {
        self.create_document(&self.users_collection, data).await
    }

    /// Lookup by the (broker login, server) pair that identifies an account.
    pub async fn find_user(&self, login: &str, server: &str) -> Result<Option<User>, StoreError> {
        let queries = [
            q_equal("broker_account", login),
            q_equal("server", server),
            q_limit(1),
        ];
        let mut users: Vec<User> = self.list_documents(&self.users_collection, &queries).await?;
        Ok(users.pop())
    }

    pub async fn get_user(&self, id: &str) -> Result<User, StoreError> {
        self.get_document(&self.users_collection, id).await
    }

    pub async fn update_user(&self, id: &str, data: Value) -> Result<Value, StoreError> {
        self.update_document(&self.users_collection, id, data).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        self.delete_document(&self.users_collection, id).await
    }

    // ---- positions ----

    pub async fn create_position(&self, data: Value) -> Result<Position, StoreError> {
        self.create_document(&self.positions_collection, data).await
    }

    pub async fn get_position(&self, id: &str) -> Result<Position, StoreError> {
        self.get_document(&self.positions_collection, id).await
    }

    pub async fn positions_for(
        &self,
        user_id: &str,
        status: Option<&str>,
    ) -> Result<Vec<Position>, StoreError> {
        let mut queries = vec![q_equal("user_id", user_id)];
        if let Some(status) = status {
            queries.push(q_equal("status", status));
        }
        queries.push(q_order_desc("opened_at"));
        self.list_documents(&self.positions_collection, &queries).await
    }

    pub async fn update_position(&self, id: &str, data: Value) -> Result<Value, StoreError> {
        self.update_document(&self.positions_collection, id, data).await
    }

    pub async fn delete_position(&self, id: &str) -> Result<(), StoreError> {
        self.delete_document(&self.positions_collection, id).await
    }

    // ---- orders ----

    pub async fn create_order(&self, data: Value) -> Result<Order, StoreError> {
        self.create_document(&self.orders_collection, data).await
    }

    pub async fn orders_for(
        &self,
        user_id: &str,
        status: Option<&str>,
    ) -> Result<Vec<Order>, StoreError> {
        let mut queries = vec![q_equal("user_id", user_id)];
        if let Some(status) = status {
            queries.push(q_equal("status", status));
        }
        queries.push(q_order_desc("created_at"));
        self.list_documents(&self.orders_collection, &queries).await
    }

    pub async fn update_order(&self, id: &str, data: Value) -> Result<Value, StoreError> {
        self.update_document(&self.orders_collection, id, data).await
    }

    pub async fn delete_order(&self, id: &str) -> Result<(), StoreError> {
        self.delete_document(&self.orders_collection, id).await
    }

    // ---- news ----

    pub async fn create_news(&self, data: Value) -> Result<News, StoreError> {
        self.create_document(&self.news_collection, data).await
    }

    pub async fn list_news(
        &self,
        category: Option<&str>,
        limit: i64,
    ) -> Result<Vec<News>, StoreError> {
        let mut queries = Vec::new();
        if let Some(category) = category {
            queries.push(q_equal("category", category));
        }
        queries.push(q_order_desc("published_at"));
        queries.push(q_limit(limit));
        self.list_documents(&self.news_collection, &queries).await
    }

    // ---- status / health ----

    pub async fn list_databases(&self) -> Result<Vec<Value>, StoreError> {
        let v = self.request(Method::GET, "/databases", None, &[]).await?;
        Ok(v.get("databases")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default())
    }

    pub async fn list_collections(&self) -> Result<Vec<Value>, StoreError> {
        let path = format!("/databases/{}/collections", self.database_id);
        let v = self.request(Method::GET, &path, None, &[]).await?;
        Ok(v.get("collections")
            .and_then(|c| c.as_array())
            .cloned()
            .unwrap_or_default())
    }

    /// True iff the store answers its health endpoint with `status: "ok"`.
    pub async fn health(&self) -> bool {
        match self.request(Method::GET, "/health", None, &[]).await {
            Ok(v) => v.get("status").and_then(|s| s.as_str()) == Some("ok"),
            Err(_) => false,
        }
    }
}
