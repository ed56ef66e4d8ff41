use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use super::static_path;
use super::uploads::{TempArtifact, UploadDir};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct Base64Image {
    /// Subtype of the declared mime type, used as the file extension.
    pub image_type: String,
    pub data: Vec<u8>,
}

/// Parses `data:image/<type>;base64,<body>`.
pub fn parse_base64_image(data_string: &str) -> Result<Base64Image, AppError> {
    let invalid = |reason: &str| AppError::InvalidImageData(reason.to_string());

    let rest = data_string
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| invalid("expected a data URI"))?;
    let (mime, body) = rest
        .split_once(";base64,")
        .ok_or_else(|| invalid("expected base64 encoding"))?;
    let (_, subtype) = mime
        .split_once('/')
        .ok_or_else(|| invalid("missing image type"))?;
    let image_type = subtype.split('+').next().unwrap_or_default();
    if image_type.is_empty() || !image_type.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("unsupported image type"));
    }

    let data = STANDARD
        .decode(body.trim())
        .map_err(|e| AppError::InvalidImageData(e.to_string()))?;

    Ok(Base64Image {
        image_type: image_type.to_ascii_lowercase(),
        data,
    })
}

fn load_image(reference: &str, static_dir: &Path) -> Result<(Vec<u8>, String), AppError> {
    if reference.starts_with("data:") {
        let image = parse_base64_image(reference)?;
        return Ok((image.data, image.image_type));
    }

    let path = static_path(static_dir, reference)
        .ok_or_else(|| AppError::InvalidImageData(format!("invalid image path: {}", reference)))?;
    let data = std::fs::read(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AppError::InvalidImageData(format!("image not found: {}", reference))
        }
        _ => AppError::Io(e),
    })?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("jpg")
        .to_string();
    Ok((data, extension))
}

fn write_archive(path: &Path, images: &[String], static_dir: &Path) -> Result<(), AppError> {
    let file = std::fs::File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (index, reference) in images.iter().enumerate() {
        let (data, extension) = load_image(reference, static_dir)?;
        writer
            .start_file(format!("{}.{}", index, extension), options)
            .map_err(|e| AppError::Archive(e.to_string()))?;
        writer.write_all(&data)?;
    }

    writer
        .finish()
        .map_err(|e| AppError::Archive(e.to_string()))?;
    Ok(())
}

/// Packs the referenced images into a fresh zip under `uploads`. A failed
/// build leaves nothing behind.
pub async fn zip_images(
    images: Vec<String>,
    uploads: &UploadDir,
    static_dir: &Path,
) -> Result<TempArtifact, AppError> {
    let artifact = uploads.reserve("zip");
    let static_dir: PathBuf = static_dir.to_path_buf();
    let count = images.len();

    // Owned by the blocking job: the path is never deleted mid-write.
    let artifact = tokio::task::spawn_blocking(move || {
        write_archive(artifact.path(), &images, &static_dir).map(|()| artifact)
    })
    .await
    .map_err(|e| AppError::Archive(e.to_string()))??;

    log::debug!("Zipped {} images into {}", count, artifact.path().display());
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    const TINY_JPEG: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";

    #[test]
    fn parses_data_uri() {
        let image = parse_base64_image(TINY_JPEG).unwrap();
        assert_eq!(image.image_type, "jpeg");
        assert_eq!(&image.data[..4], &[0xff, 0xd8, 0xff, 0xe0]);
    }

    #[test]
    fn svg_subtype_is_reduced_to_extension() {
        let image = parse_base64_image("data:image/svg+xml;base64,PHN2Zz4=").unwrap();
        assert_eq!(image.image_type, "svg");
        assert_eq!(image.data, b"<svg>");
    }

    #[test]
    fn rejects_malformed_payloads() {
        for bad in [
            "/9j/4AAQSkZJRg==",
            "data:image/jpeg,/9j/4AAQ",
            "data:jpeg;base64,/9j/4AAQ",
            "data:image/../x;base64,/9j/4AAQ",
            "data:image/png;base64,@@@",
        ] {
            assert!(
                matches!(parse_base64_image(bad), Err(AppError::InvalidImageData(_))),
                "accepted {}",
                bad
            );
        }
    }

    #[actix_web::test]
    async fn zips_base64_and_static_images() {
        let static_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(static_dir.path().join("images")).unwrap();
        std::fs::write(static_dir.path().join("images/dog.png"), b"dog").unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(scratch.path().to_path_buf());

        let images = vec![TINY_JPEG.to_string(), "images/dog.png".to_string()];
        let artifact = zip_images(images, &uploads, static_dir.path()).await.unwrap();

        let file = std::fs::File::open(artifact.path()).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert_eq!(archive.len(), 2);
        let mut contents = Vec::new();
        archive
            .by_name("1.png")
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, b"dog");
        assert!(archive.by_name("0.jpeg").is_ok());
    }

    #[actix_web::test]
    async fn failed_zip_leaves_no_archive() {
        let static_dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(scratch.path().to_path_buf());

        let images = vec![TINY_JPEG.to_string(), "images/missing.jpg".to_string()];
        let result = zip_images(images, &uploads, static_dir.path()).await;

        assert!(matches!(result, Err(AppError::InvalidImageData(_))));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
