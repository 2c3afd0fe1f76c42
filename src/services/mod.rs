pub mod appwrite;
pub mod crypto;
pub mod locks;
pub mod metaapi;
pub mod provision;

pub mod news_service;
pub mod trading_service;
pub mod user_service;
