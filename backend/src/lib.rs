pub mod config;
pub mod error;
pub mod recognition;
pub mod results;
pub mod routes;
pub mod services;
pub mod storage;

use actix_web::{HttpRequest, web};
use reqwest::Client as HttpClient;
use std::sync::Arc;

use config::{AppConfig, StorageConfig};
use error::AppError;
use recognition::{KeywordExtraction, VisualRecognition};
use routes::{TextFieldLimit, configure_routes};
use services::classification::ClassificationService;
use services::image_resolver::ImageResolver;
use services::training::TrainingService;
use storage::uploads::UploadDir;

/// Everything the HTTP layer needs, built once and cloned into each worker.
#[derive(Clone)]
pub struct AppState {
    pub classification: ClassificationService,
    pub training: TrainingService,
    pub uploads: UploadDir,
    pub storage: StorageConfig,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        http_client: HttpClient,
        recognition: Arc<dyn VisualRecognition>,
        keywords: Arc<dyn KeywordExtraction>,
    ) -> Self {
        let uploads = UploadDir::new(config.storage.uploads_dir.clone());
        let resolver = ImageResolver::new(
            uploads.clone(),
            config.storage.static_dir.clone(),
            http_client,
        );
        let classification = ClassificationService::new(
            resolver,
            recognition.clone(),
            keywords,
            config.classify.clone(),
        );
        let training = TrainingService::new(
            uploads.clone(),
            config.storage.static_dir.clone(),
            recognition,
        );

        Self {
            classification,
            training,
            uploads,
            storage: config.storage.clone(),
            max_body_bytes: config.server.max_body_bytes,
        }
    }
}

fn invalid_body(err: impl std::fmt::Display, req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected body for {}: {}", req.path(), err);
    AppError::InvalidBody(err.to_string()).into()
}

pub fn configure_app(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(web::Data::new(state.classification.clone()))
        .app_data(web::Data::new(state.training.clone()))
        .app_data(web::Data::new(state.uploads.clone()))
        .app_data(web::Data::new(state.storage.clone()))
        .app_data(web::Data::new(TextFieldLimit(state.max_body_bytes)))
        .app_data(
            web::JsonConfig::default()
                .limit(state.max_body_bytes)
                .error_handler(|err, req| invalid_body(err, req)),
        )
        .app_data(
            web::FormConfig::default()
                .limit(state.max_body_bytes)
                .error_handler(|err, req| invalid_body(err, req)),
        )
        .app_data(web::QueryConfig::default().error_handler(|err, req| invalid_body(err, req)))
        .app_data(web::PayloadConfig::new(state.max_body_bytes));
    configure_routes(cfg, &state.storage);
}
