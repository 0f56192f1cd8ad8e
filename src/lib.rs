//! Libris Library Lending Server
//!
//! A Rust REST JSON API for managing authors and books, lending copies out
//! and taking them back, and snapshotting usage counts to report files.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository, &config.reports);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
