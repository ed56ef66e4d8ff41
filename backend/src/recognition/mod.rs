pub mod alchemy;
pub mod watson;

use async_trait::async_trait;
use reqwest::Body;
use reqwest::multipart::Part;
use shared::{ClassificationResult, Classifier, KeywordResult};
use std::path::Path;
use tokio::fs::File;

#[derive(Debug, thiserror::Error)]
#[error("Remote service error: {message}")]
pub struct RemoteServiceError {
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteServiceError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for RemoteServiceError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.status().map(|s| s.as_u16()), err.to_string())
    }
}

enum UploadBody {
    File(File),
    Remote(reqwest::Response),
}

/// A byte source handed to a remote service. Either an open local file or
/// the still-unread body of an HTTP response.
pub struct Upload {
    file_name: String,
    content_type: Option<String>,
    body: UploadBody,
}

impl Upload {
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        let content_type = guess_content_type(&file_name).map(str::to_string);
        Ok(Self {
            file_name,
            content_type,
            body: UploadBody::File(file),
        })
    }

    pub fn remote(response: reqwest::Response) -> Self {
        let file_name = response
            .url()
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|name| !name.is_empty())
            .unwrap_or("image")
            .to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| guess_content_type(&file_name).map(str::to_string));
        Self {
            file_name,
            content_type,
            body: UploadBody::Remote(response),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn into_body(self) -> Body {
        match self.body {
            UploadBody::File(file) => Body::from(file),
            UploadBody::Remote(response) => Body::wrap_stream(response.bytes_stream()),
        }
    }

    pub fn into_part(self) -> Result<Part, RemoteServiceError> {
        let file_name = self.file_name.clone();
        let content_type = self.content_type.clone();
        let part = Part::stream(self.into_body()).file_name(file_name);
        match content_type {
            Some(mime) => Ok(part.mime_str(&mime)?),
            None => Ok(part),
        }
    }
}

fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let extension = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "zip" => Some("application/zip"),
        _ => None,
    }
}

pub struct TrainingData {
    pub positive_examples: Upload,
    pub negative_examples: Upload,
    pub name: String,
}

#[async_trait]
pub trait VisualRecognition: Send + Sync {
    async fn create_classifier(&self, training: TrainingData)
    -> Result<Classifier, RemoteServiceError>;

    async fn classify(
        &self,
        image: Upload,
        classifier_ids: &[String],
    ) -> Result<ClassificationResult, RemoteServiceError>;
}

#[async_trait]
pub trait KeywordExtraction: Send + Sync {
    async fn get_image_keywords(&self, image: Upload) -> Result<KeywordResult, RemoteServiceError>;
}

/// Turns a non-2xx response into an error, reading `{error|description, code}` when present.
pub(crate) async fn error_from_response(response: reqwest::Response) -> RemoteServiceError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| {
            body.get("error")
                .or_else(|| body.get("description"))
                .and_then(|msg| msg.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.to_string()
            } else {
                text
            }
        });
    RemoteServiceError::new(Some(status.as_u16()), message)
}
