pub mod health_controller;
pub mod news_controller;
pub mod trading_controller;
pub mod user_controller;
