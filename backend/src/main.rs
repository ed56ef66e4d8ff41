use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer};
use recognition_demo::config::AppConfig;
use recognition_demo::recognition::alchemy::AlchemyVision;
use recognition_demo::recognition::watson::WatsonVisualRecognition;
use recognition_demo::{AppState, configure_app};
use reqwest::Client as HttpClient;
use std::env;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let http_client = HttpClient::builder()
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let recognition = Arc::new(WatsonVisualRecognition::new(
        http_client.clone(),
        config.visual_recognition.clone(),
    ));
    let keywords = Arc::new(AlchemyVision::new(http_client.clone(), config.alchemy.clone()));

    let state = AppState::new(&config, http_client, recognition, keywords);

    state.uploads.ensure_exists().await?;
    match state.uploads.sweep().await {
        Ok(0) => {}
        Ok(count) => log::info!(
            "Removed {} leftover files from {}",
            count,
            state.uploads.root().display()
        ),
        Err(e) => log::warn!("Failed to sweep uploads directory: {}", e),
    }

    log::info!(
        "Classify mode {:?} with classifiers {:?}",
        config.classify.mode,
        config.classify.classifier_ids
    );

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(|cfg| configure_app(cfg, &state))
    })
    .bind(&bind_address)?
    .run()
    .await
}
