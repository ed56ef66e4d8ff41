use actix_files::{Files, NamedFile};
use actix_multipart::{Field, Multipart};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, HttpResponse, web};
use futures::TryStreamExt;
use serde::Deserialize;
use shared::{TrainingRequest, View};
use std::path::Path;
use strum::IntoEnumIterator;
use tokio::io::AsyncWriteExt;

use crate::config::StorageConfig;
use crate::error::AppError;
use crate::services::classification::ClassificationService;
use crate::services::image_resolver::{ClassifyRequest, UploadedFile};
use crate::services::training::TrainingService;
use crate::storage::uploads::UploadDir;

const IMAGES_FILE_FIELD: &str = "images_file";
const DEFAULT_UPLOAD_EXTENSION: &str = "jpg";

#[derive(Debug, Default, Deserialize)]
struct ClassifyForm {
    image_data: Option<String>,
    url: Option<String>,
    classifier_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClassifyQuery {
    classifier_id: Option<String>,
}

/// Upper bound on buffered text fields in a multipart body.
#[derive(Debug, Clone, Copy)]
pub struct TextFieldLimit(pub usize);

pub fn configure_routes(cfg: &mut web::ServiceConfig, storage: &StorageConfig) {
    cfg.service(web::resource("/api/classifiers").route(web::post().to(create_classifier)))
        .service(web::resource("/api/classify").route(web::post().to(classify)))
        .service(
            web::resource("/")
                .app_data(web::Data::new(View::Use))
                .route(web::get().to(render_view)),
        );
    for view in View::iter() {
        cfg.service(
            web::resource(format!("/{}", view.as_ref()))
                .app_data(web::Data::new(view))
                .route(web::get().to(render_view)),
        );
    }
    cfg.service(Files::new("/", storage.static_dir.clone()));
}

async fn render_view(
    view: web::Data<View>,
    storage: web::Data<StorageConfig>,
) -> Result<NamedFile, AppError> {
    let path = storage.views_dir.join(format!("{}.html", view.get_ref().as_ref()));
    Ok(NamedFile::open_async(path).await?)
}

async fn create_classifier(
    training: web::Data<TrainingService>,
    body: web::Json<TrainingRequest>,
) -> Result<HttpResponse, AppError> {
    let classifier = training.create_classifier(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(classifier))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn classify(
    req: HttpRequest,
    payload: web::Payload,
    query: web::Query<ClassifyQuery>,
    service: web::Data<ClassificationService>,
    uploads: web::Data<UploadDir>,
    storage: web::Data<StorageConfig>,
    text_limit: web::Data<TextFieldLimit>,
) -> Result<HttpResponse, Error> {
    let mut request = match req.content_type() {
        "multipart/form-data" => {
            let multipart = Multipart::new(req.headers(), payload);
            read_multipart(multipart, &uploads, storage.max_upload_bytes, text_limit.0).await?
        }
        "application/x-www-form-urlencoded" => {
            let form = web::Form::<ClassifyForm>::from_request(&req, &mut payload.into_inner()).await?;
            form_request(form.into_inner())
        }
        _ => {
            let json = web::Json::<ClassifyForm>::from_request(&req, &mut payload.into_inner()).await?;
            form_request(json.into_inner())
        }
    };
    if request.classifier_id.is_none() {
        request.classifier_id = non_empty(query.into_inner().classifier_id);
    }

    let result = service.classify(request).await?;
    Ok(HttpResponse::Ok().json(result))
}

fn form_request(form: ClassifyForm) -> ClassifyRequest {
    ClassifyRequest {
        file: None,
        image_data: non_empty(form.image_data),
        url: non_empty(form.url),
        classifier_id: non_empty(form.classifier_id),
    }
}

fn upload_extension(file_name: Option<&str>) -> &str {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(DEFAULT_UPLOAD_EXTENSION)
}

fn multipart_error(err: actix_multipart::MultipartError) -> AppError {
    AppError::InvalidBody(err.to_string())
}

async fn save_upload(
    field: &mut Field,
    uploads: &UploadDir,
    max_bytes: usize,
) -> Result<Option<UploadedFile>, AppError> {
    let file_name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .map(str::to_string);
    let artifact = uploads.reserve(upload_extension(file_name.as_deref()));
    let mut file = tokio::fs::File::create(artifact.path()).await?;

    let mut written = 0usize;
    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        written += chunk.len();
        if written > max_bytes {
            log::warn!("Upload exceeded {} bytes, discarding", max_bytes);
            return Err(AppError::UploadTooLarge);
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    if written == 0 {
        return Ok(None);
    }
    log::debug!("Saved upload ({} bytes) to {}", written, artifact.path().display());
    Ok(Some(UploadedFile {
        artifact,
        file_name,
    }))
}

async fn read_text(field: &mut Field, max_bytes: usize) -> Result<String, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        if data.len() + chunk.len() > max_bytes {
            return Err(AppError::InvalidBody("form field too large".to_string()));
        }
        data.extend_from_slice(&chunk);
    }
    String::from_utf8(data).map_err(|e| AppError::InvalidBody(e.to_string()))
}

async fn read_multipart(
    mut multipart: Multipart,
    uploads: &UploadDir,
    max_upload_bytes: usize,
    max_text_bytes: usize,
) -> Result<ClassifyRequest, AppError> {
    let mut request = ClassifyRequest::default();

    while let Some(mut field) = multipart.try_next().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            IMAGES_FILE_FIELD => {
                if let Some(file) = save_upload(&mut field, uploads, max_upload_bytes).await? {
                    request.file = Some(file);
                }
            }
            "image_data" => {
                request.image_data = non_empty(Some(read_text(&mut field, max_text_bytes).await?));
            }
            "url" => {
                request.url = non_empty(Some(read_text(&mut field, max_text_bytes).await?));
            }
            "classifier_id" => {
                request.classifier_id = non_empty(Some(read_text(&mut field, max_text_bytes).await?));
            }
            _ => {
                while field.try_next().await.map_err(multipart_error)?.is_some() {}
            }
        }
    }
    Ok(request)
}
