// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use anyhow::Context;
use log::{error, info};
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use crate::config::Config;
use crate::handlers::{
    clear_history, create_session, delete_session, download_image, download_original,
    get_history, get_latest, list_models, list_styles, try_on,
};
use crate::services::{GeminiBackend, GenerationClient, ImageProcessor, RetryPolicy, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionRegistry>,
    generation_client: Arc<GenerationClient>,
    image_processor: Arc<ImageProcessor>,
}

impl AppState {
    pub fn new(generation_client: GenerationClient) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new()),
            generation_client: Arc::new(generation_client),
            image_processor: Arc::new(ImageProcessor::new()),
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting virtual try-on service...");

    let config = Config::from_env().inspect_err(|e| error!("{}", e))?;

    let backend = Arc::new(GeminiBackend::new(&config));
    let generation_client = GenerationClient::new(backend, RetryPolicy::new(config.max_retries));
    let app_state = AppState::new(generation_client);

    info!(
        "Using model {} with up to {} attempt(s) per generation",
        config.model, config.max_retries
    );
    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("Failed to bind {}", config.bind_addr))?
    .run()
    .await
    .context("HTTP server terminated with an error")?;

    Ok(())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/styles", web::get().to(list_styles))
            .route("/models", web::get().to(list_models))
            .route("/sessions", web::post().to(create_session))
            .route("/sessions/{session_id}", web::delete().to(delete_session))
            .route("/sessions/{session_id}/tryon", web::post().to(try_on))
            .route("/sessions/{session_id}/history", web::get().to(get_history))
            .route("/sessions/{session_id}/history", web::delete().to(clear_history))
            .route("/sessions/{session_id}/latest", web::get().to(get_latest))
            .route(
                "/sessions/{session_id}/results/{result_id}/images/{index}",
                web::get().to(download_image),
            )
            .route(
                "/sessions/{session_id}/results/{result_id}/original",
                web::get().to(download_original),
            ),
    )
    .route("/health", web::get().to(health_check));
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "tryon",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
