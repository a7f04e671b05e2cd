use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::AuthService;
use crate::config::Config;

/// Shared application state available in all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
}

pub mod analytics;
pub mod auth;
pub mod group_members;
pub mod groups;
pub mod transactions;
pub mod users;
