//! The `studypulse serve` command.

use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{http::header, web, App, HttpServer};
use anyhow::{Context, Result};
use tracing::info;

use studypulse_server::{api, load_app_config, AppState};

pub async fn execute(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_app_config(config_path.as_deref())?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let storage = super::open_storage(&config).await?;
    let service = super::build_service(&config, storage)?;
    let secret = config.jwt_secret();
    let state = web::Data::new(AppState::new(service, config.server.clone(), &secret));

    let bind = (config.server.host.clone(), config.server.port);
    let origin = config.server.cors_origin.clone();
    info!(
        host = %bind.0,
        port = bind.1,
        provider = %config.llm.default_provider,
        model = %config.llm.default_model,
        "starting server"
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&origin)
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);
        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(api::configure)
    })
    .bind(bind.clone())
    .with_context(|| format!("failed to bind {}:{}", bind.0, bind.1))?
    .run()
    .await
    .context("server terminated with an error")
}
