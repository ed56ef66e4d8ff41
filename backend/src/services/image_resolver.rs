use reqwest::Client as HttpClient;
use std::path::PathBuf;

use crate::error::AppError;
use crate::recognition::Upload;
use crate::storage::static_path;
use crate::storage::uploads::{TempArtifact, UploadDir};
use crate::storage::zip_utils::parse_base64_image;

const LOCAL_IMAGE_PREFIX: &str = "images";

/// A file received through multipart upload, already written to the uploads dir.
#[derive(Debug)]
pub struct UploadedFile {
    pub artifact: TempArtifact,
    pub file_name: Option<String>,
}

/// The candidate image sources of one classify request.
#[derive(Debug, Default)]
pub struct ClassifyRequest {
    pub file: Option<UploadedFile>,
    pub image_data: Option<String>,
    pub url: Option<String>,
    pub classifier_id: Option<String>,
}

/// Which source was picked; useful in logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSourceKind {
    Upload,
    Base64,
    Remote,
    Local,
}

pub struct ResolvedImage {
    pub kind: ImageSourceKind,
    pub upload: Upload,
    /// Set when the image lives in a scratch file this request owns.
    pub artifact: Option<TempArtifact>,
}

/// Accepts what a lenient URL validator would: http(s)/ftp, or a bare host
/// with a dotted name, no whitespace.
pub fn is_url(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let parsed = match url::Url::parse(candidate) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            match url::Url::parse(&format!("http://{}", candidate)) {
                Ok(url) => url,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };
    if !matches!(parsed.scheme(), "http" | "https" | "ftp") {
        return false;
    }
    match parsed.host() {
        Some(url::Host::Domain(domain)) => {
            let labels: Vec<&str> = domain.split('.').collect();
            labels.len() >= 2
                && labels.iter().all(|label| !label.is_empty())
                && labels
                    .last()
                    .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
        }
        Some(_) => true,
        None => false,
    }
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

fn with_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

#[derive(Clone)]
pub struct ImageResolver {
    uploads: UploadDir,
    static_dir: PathBuf,
    http_client: HttpClient,
}

impl ImageResolver {
    pub fn new(uploads: UploadDir, static_dir: PathBuf, http_client: HttpClient) -> Self {
        Self {
            uploads,
            static_dir,
            http_client,
        }
    }

    /// Picks the image source: upload, then base64 payload, then remote URL,
    /// then a path under the static root.
    pub async fn resolve(&self, request: ClassifyRequest) -> Result<ResolvedImage, AppError> {
        if let Some(file) = request.file {
            let upload = Upload::open(file.artifact.path()).await?;
            log::info!(
                "Classifying uploaded file {}",
                file.file_name.as_deref().unwrap_or(upload.file_name())
            );
            return Ok(ResolvedImage {
                kind: ImageSourceKind::Upload,
                upload,
                artifact: Some(file.artifact),
            });
        }

        if let Some(image_data) = request.image_data.as_deref() {
            let image = parse_base64_image(image_data)?;
            let artifact = self.uploads.write(&image.image_type, &image.data).await?;
            let upload = Upload::open(artifact.path()).await?;
            log::info!("Classifying base64 image stored at {}", artifact.path().display());
            return Ok(ResolvedImage {
                kind: ImageSourceKind::Base64,
                upload,
                artifact: Some(artifact),
            });
        }

        match request.url.as_deref() {
            Some(url) if is_url(url) => {
                let target = with_scheme(strip_query(url));
                log::info!("Classifying remote image {}", target);
                let response = self
                    .http_client
                    .get(&target)
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .map_err(|e| AppError::ImageFetch(e.to_string()))?;
                Ok(ResolvedImage {
                    kind: ImageSourceKind::Remote,
                    upload: Upload::remote(response),
                    artifact: None,
                })
            }
            Some(url) if url.starts_with(LOCAL_IMAGE_PREFIX) => {
                let path = static_path(&self.static_dir, url).ok_or(AppError::MalformedUrl)?;
                let upload = Upload::open(&path).await?;
                log::info!("Classifying local image {}", path.display());
                Ok(ResolvedImage {
                    kind: ImageSourceKind::Local,
                    upload,
                    artifact: None,
                })
            }
            _ => Err(AppError::MalformedUrl),
        }
    }
}
