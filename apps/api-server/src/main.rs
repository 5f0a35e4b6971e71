//! # Forum API Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_web::{App, HttpServer, web};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

#[cfg(feature = "scheduler")]
mod background;
mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use forum_core::ports::TokenService;
use forum_infra::JwtTokenService;
use middleware::admission::AdmissionMiddleware;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::{TelemetryConfig, init_telemetry};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        host = %config.host,
        port = config.port,
        strategy = ?config.admission.strategy,
        "Starting Forum API Server"
    );

    let state = AppState::new(&config)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::from_env());

    #[cfg(feature = "scheduler")]
    let mut scheduler = match background::start(
        background::SchedulerConfig::from_env(),
        state.limiter.clone(),
    )
    .await
    {
        Ok(scheduler) => Some(scheduler),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start scheduler, idle windows only evicted on capacity");
            None
        }
    };

    let trust_proxy = config.admission.trust_proxy;
    let server_state = state.clone();

    let result = HttpServer::new(move || {
        App::new()
            .wrap(AdmissionMiddleware::new(server_state.limiter.clone(), trust_proxy))
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(server_state.clone()))
            .app_data(web::Data::new(tokens.clone()))
            .app_data(handlers::json_config())
            .app_data(handlers::query_config())
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    #[cfg(feature = "scheduler")]
    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler shutdown failed");
        }
    }

    result
}
