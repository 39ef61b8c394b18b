//! # Blogicum server
//!
//! The main entry point for the Actix-web HTTP server.

use std::sync::Arc;

use actix_files::Files;
use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

use blog_server::config::AppConfig;
use blog_server::handlers;
use blog_server::middleware::csrf::CsrfMiddleware;
use blog_server::observability::RequestIdMiddleware;
use blog_server::state::AppState;
use blog_server::telemetry::{TelemetryConfig, init_telemetry};
use blogicum_infra::LocalMediaStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Blogicum on {}:{} ({} posts per page, {:?} ownership policy)",
        config.host,
        config.port,
        config.blog.posts_per_page,
        config.blog.ownership_policy,
    );

    let media = LocalMediaStore::new(&config.media_root)
        .await
        .map_err(std::io::Error::other)?;
    let media_root = media.root().to_path_buf();
    let state = AppState::new(&config, Arc::new(media))
        .await
        .map_err(|e| {
            tracing::error!("{}", e);
            std::io::Error::other(e)
        })?;

    HttpServer::new(move || {
        App::new()
            .wrap(CsrfMiddleware)
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
            .service(Files::new("/media", media_root.clone()))
            .default_service(web::to(handlers::not_found))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
