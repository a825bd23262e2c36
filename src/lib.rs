pub mod config;
pub mod db;
pub mod export;
pub mod review;
pub mod roles;
pub mod seed;
pub mod validation;
pub mod web;

pub use config::AppConfig;
pub use web::{AppState, router::build_router};

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
