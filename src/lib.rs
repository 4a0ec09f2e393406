use std::sync::Arc;

use config::Config;
use db::Store;
use mail::Mailer;

pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod uploads;
pub mod utils;

pub use routes::create_router;

pub struct AppState {
    pub env: Config,
    pub db_client: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
}
