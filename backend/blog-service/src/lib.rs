/// Blog Service Library
///
/// Posts, groups, comments and follows for the Yatube social blogging platform.
/// The interesting part is the permission layer: owner-only writes, comments
/// scoped to their post, and the follow relationship rules.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `models`: Entities and request bodies
/// - `services`: Business logic layer
/// - `db`: `Store` trait with in-memory and PostgreSQL implementations
/// - `middleware`: Identity extraction and ownership policy
/// - `error`: Error types and handling
/// - `config`: Configuration management
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, Result};

/// Post list paging bounds
#[derive(Debug, Clone, Copy)]
pub struct PaginationSettings {
    pub max_limit: i64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self { max_limit: 100 }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn db::Store>,
    pub pagination: PaginationSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn db::Store>) -> Self {
        Self {
            store,
            pagination: PaginationSettings::default(),
        }
    }
}
