pub mod config;
pub mod database;
pub mod entity;
pub mod models;
pub mod redis;

pub use crate::config::Config;
pub use crate::database::get_db_connection;
pub use crate::models::*;
pub use crate::redis::{connection_config, get_redis_client, get_redis_connection, Redis};
