use studypulse_core::StudyService;

use crate::auth::JwtKeys;
use crate::config::ServerConfig;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: StudyService,
    pub jwt: JwtKeys,
    pub server: ServerConfig,
}

impl AppState {
    pub fn new(service: StudyService, server: ServerConfig, jwt_secret: &str) -> Self {
        let jwt = JwtKeys::new(jwt_secret, server.token_ttl_hours);
        Self {
            service,
            jwt,
            server,
        }
    }
}
