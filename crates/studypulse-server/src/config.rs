//! Application configuration: the `[llm]`, `[server]` and `[quiz]` tables of
//! `studypulse.toml` plus environment overrides.

use std::path::Path;

use anyhow::{Context, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use studypulse_core::service::QuizSettings;
use studypulse_providers::config::find_config_file;
use studypulse_providers::StudyPulseConfig;

/// Default SQLite database, created on first start.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://studypulse.db?mode=rwc";

/// HTTP server settings.
///
/// Custom Debug impl masks the JWT secret.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS.
    pub cors_origin: String,
    /// HS256 signing secret. Empty means a random per-process secret.
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    /// Honor `role: "admin"` on self-registration.
    pub allow_admin_signup: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            cors_origin: "http://localhost:5173".into(),
            jwt_secret: String::new(),
            token_ttl_hours: 24,
            max_upload_bytes: 20 * 1024 * 1024,
            allow_admin_signup: false,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_origin", &self.cors_origin)
            .field("jwt_secret", &"***")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("allow_admin_signup", &self.allow_admin_signup)
            .finish()
    }
}

/// Everything the `studypulse` binary reads from its config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub llm: StudyPulseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub quiz: QuizSettings,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            llm: StudyPulseConfig::default(),
            server: ServerConfig::default(),
            quiz: QuizSettings::default(),
        }
    }
}

impl AppConfig {
    /// Apply `DATABASE_URL`, `JWT_SECRET`, `PORT`, `CORS_ORIGIN` and
    /// `MAX_FILE_SIZE`, then the LLM provider overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.server.jwt_secret = secret;
        }
        if let Ok(origin) = std::env::var("CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT: {port}"))?;
        }
        if let Ok(size) = std::env::var("MAX_FILE_SIZE") {
            self.server.max_upload_bytes = size
                .trim()
                .parse()
                .with_context(|| format!("invalid MAX_FILE_SIZE: {size}"))?;
        }
        self.llm.apply_env_overrides();
        Ok(())
    }

    /// The configured JWT secret, or a random one when none is set.
    ///
    /// A random secret invalidates every token on restart.
    pub fn jwt_secret(&self) -> String {
        if self.server.jwt_secret.is_empty() {
            warn!("no JWT secret configured; using a random per-process secret");
            rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(48)
                .map(char::from)
                .collect()
        } else {
            self.server.jwt_secret.clone()
        }
    }
}

/// Load the app config from an explicit path, or search the default locations.
pub fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match find_config_file(path)? {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<AppConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AppConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}
