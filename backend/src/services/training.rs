use serde_json::Value;
use shared::{Classifier, TrainingRequest};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::error::AppError;
use crate::recognition::{TrainingData, Upload, VisualRecognition};
use crate::storage::uploads::{TempArtifact, UploadDir};
use crate::storage::zip_utils::zip_images;

/// Fewest positive or negative examples the remote API will train on.
pub const MIN_EXAMPLES: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTraining {
    pub positives: Vec<String>,
    pub negatives: Vec<String>,
    pub name: String,
}

fn as_array(value: Option<Value>) -> Option<Vec<Value>> {
    match value {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Every image must be a base64 data URI or a path under the static root.
fn image_references(items: Vec<Value>) -> Result<Vec<String>, AppError> {
    items
        .into_iter()
        .map(|item| match item {
            Value::String(reference) => Ok(reference),
            other => Err(AppError::InvalidImageData(format!(
                "image reference must be a string, got {}",
                other
            ))),
        })
        .collect()
}

pub fn validate(request: TrainingRequest) -> Result<ValidatedTraining, AppError> {
    let positives = as_array(request.positives).ok_or(AppError::MissingPositives)?;
    let negatives = as_array(request.negatives).ok_or(AppError::MissingNegatives)?;
    let name = match request.name {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        _ => return Err(AppError::MissingName),
    };

    if positives.len() < MIN_EXAMPLES {
        return Err(AppError::InsufficientPositives(positives.len()));
    }
    if negatives.len() < MIN_EXAMPLES {
        return Err(AppError::InsufficientNegatives(negatives.len()));
    }

    Ok(ValidatedTraining {
        positives: image_references(positives)?,
        negatives: image_references(negatives)?,
        name,
    })
}

#[derive(Clone)]
pub struct TrainingService {
    uploads: UploadDir,
    static_dir: PathBuf,
    recognition: Arc<dyn VisualRecognition>,
}

impl TrainingService {
    pub fn new(uploads: UploadDir, static_dir: PathBuf, recognition: Arc<dyn VisualRecognition>) -> Self {
        Self {
            uploads,
            static_dir,
            recognition,
        }
    }

    async fn submit(
        &self,
        positives: &TempArtifact,
        negatives: &TempArtifact,
        name: String,
    ) -> Result<Classifier, AppError> {
        let training = TrainingData {
            positive_examples: Upload::open(positives.path()).await?,
            negative_examples: Upload::open(negatives.path()).await?,
            name,
        };
        Ok(self.recognition.create_classifier(training).await?)
    }

    /// Zips both example sets in parallel, submits them and removes the
    /// archives whatever the outcome.
    pub async fn create_classifier(&self, request: TrainingRequest) -> Result<Classifier, AppError> {
        let ValidatedTraining {
            positives,
            negatives,
            name,
        } = validate(request)?;

        let started = Instant::now();
        // Both jobs are awaited; if one fails the other's archive is dropped and deleted.
        let (positive_zip, negative_zip) = tokio::join!(
            zip_images(positives, &self.uploads, &self.static_dir),
            zip_images(negatives, &self.uploads, &self.static_dir),
        );
        let (positive_zip, negative_zip) = (positive_zip?, negative_zip?);

        let outcome = self.submit(&positive_zip, &negative_zip, name).await;
        log::info!("Training request took {:?}", started.elapsed());

        log::info!("Deleting positive images: {}", positive_zip.path().display());
        positive_zip.remove().await;
        log::info!("Deleting negative images: {}", negative_zip.path().display());
        negative_zip.remove().await;

        match &outcome {
            Ok(classifier) => log::info!(
                "Created classifier {}",
                classifier.classifier_id.as_deref().unwrap_or("(no id)")
            ),
            Err(e) => log::error!("Training failed: {}", e),
        }
        outcome
    }
}
