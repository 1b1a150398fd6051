//! studypulse-server — HTTP JSON API and application wiring for StudyPulse.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;

pub use config::{load_app_config, AppConfig};
pub use error::ApiError;
pub use state::AppState;
