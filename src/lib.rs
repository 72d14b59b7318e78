pub mod config;
pub mod db;
pub mod engine;
pub mod feeds;
pub mod item;
pub mod logging;
pub mod render;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_ENGINE: &str = "engine";
pub const TARGET_DB: &str = "db_query";
