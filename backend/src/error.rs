use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::ErrorResponse;

use crate::recognition::RemoteServiceError;
use crate::services::training::MIN_EXAMPLES;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing positives images")]
    MissingPositives,
    #[error("Missing negatives images")]
    MissingNegatives,
    #[error("Missing classifier name")]
    MissingName,
    #[error("Minimum positives images ({min}) sent:{0}", min = MIN_EXAMPLES)]
    InsufficientPositives(usize),
    #[error("Minimum negatives images ({min}) sent:{0}", min = MIN_EXAMPLES)]
    InsufficientNegatives(usize),
    #[error("Malformed URL")]
    MalformedUrl,
    #[error("Invalid image data: {0}")]
    InvalidImageData(String),
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("Uploaded file is too large")]
    UploadTooLarge,
    #[error("Unable to fetch image: {0}")]
    ImageFetch(String),
    #[error("Failed to build archive: {0}")]
    Archive(String),
    #[error(transparent)]
    Remote(#[from] RemoteServiceError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::MissingPositives
                | AppError::MissingNegatives
                | AppError::MissingName
                | AppError::InsufficientPositives(_)
                | AppError::InsufficientNegatives(_)
                | AppError::MalformedUrl
                | AppError::InvalidImageData(_)
                | AppError::InvalidBody(_)
                | AppError::ImageFetch(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            AppError::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Remote(remote) => remote
                .status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }
        HttpResponse::build(status).json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_requests() {
        assert_eq!(AppError::MalformedUrl.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::InsufficientPositives(9).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InsufficientPositives(9).to_string(),
            "Minimum positives images (10) sent:9"
        );
    }

    #[test]
    fn remote_status_passes_through() {
        let err = AppError::Remote(RemoteServiceError::new(Some(404), "Classifier not found"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = AppError::Remote(RemoteServiceError::new(Some(200), "odd"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = AppError::Remote(RemoteServiceError::new(None, "connection reset"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn body_carries_error_and_code() {
        let response = AppError::MalformedUrl.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            parsed,
            ErrorResponse {
                error: "Malformed URL".into(),
                code: 400
            }
        );
    }
}
