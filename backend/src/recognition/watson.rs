use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::multipart::Form;
use serde::de::DeserializeOwned;
use serde_json::json;
use shared::{ClassificationResult, Classifier};

use super::{RemoteServiceError, TrainingData, Upload, VisualRecognition, error_from_response};
use crate::config::VisualRecognitionConfig;

/// Client for the Visual Recognition v2-beta classifier API.
#[derive(Clone)]
pub struct WatsonVisualRecognition {
    http_client: HttpClient,
    config: VisualRecognitionConfig,
}

impl WatsonVisualRecognition {
    pub fn new(http_client: HttpClient, config: VisualRecognitionConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    async fn send_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, RemoteServiceError> {
        let response = self
            .http_client
            .post(self.endpoint(path))
            .query(&[("version", self.config.version_date.as_str())])
            .basic_auth(&self.config.username, Some(&self.config.password))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl VisualRecognition for WatsonVisualRecognition {
    async fn create_classifier(
        &self,
        training: TrainingData,
    ) -> Result<Classifier, RemoteServiceError> {
        log::debug!("Creating classifier '{}'", training.name);
        let form = Form::new()
            .part("positive_examples", training.positive_examples.into_part()?)
            .part("negative_examples", training.negative_examples.into_part()?)
            .text("name", training.name);
        self.send_form("v2/classifiers", form).await
    }

    async fn classify(
        &self,
        image: Upload,
        classifier_ids: &[String],
    ) -> Result<ClassificationResult, RemoteServiceError> {
        log::debug!(
            "Classifying '{}' with classifiers {:?}",
            image.file_name(),
            classifier_ids
        );
        let form = Form::new()
            .part("images_file", image.into_part()?)
            .text(
                "classifier_ids",
                json!({ "classifier_ids": classifier_ids }).to_string(),
            );
        self.send_form("v2/classify", form).await
    }
}
