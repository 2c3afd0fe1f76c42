//! Library entrypoint for TradeDesk.
//!
//! This file exists mainly to make controller tests easy (integration tests
//! under `tests/` can import the app state, routers, controllers, services).

pub mod config;
pub mod error;
pub mod models;

pub mod services;

pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: services::appwrite::AppwriteClient,
    /// `None` when no trading-backend token is configured; cached reads keep
    /// working, trading endpoints answer 503.
    pub metaapi: Option<services::metaapi::MetaApiClient>,
    pub cipher: services::crypto::PasswordCipher,
    /// Single-flight guards for connect requests, keyed by "login|server".
    pub connect_locks: services::locks::KeyedLocks<()>,
}
