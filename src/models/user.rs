use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored broker account. One document per (broker_account, server) pair;
/// the password is held only in AES-GCM-encrypted form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "$id")]
    pub id: String,

    pub broker_account: String,

    pub encrypted_password: String,
    pub iv: String,
    pub auth_tag: String,

    pub server: String,
    pub broker: String,
    pub account_type: String,

    pub balance: f64,
    pub equity: f64,
    pub currency: String,

    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}
