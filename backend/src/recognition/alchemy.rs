use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use shared::KeywordResult;

use super::{KeywordExtraction, RemoteServiceError, Upload, error_from_response};
use crate::config::AlchemyConfig;

#[derive(Debug, Deserialize)]
struct AlchemyResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "statusInfo", default)]
    status_info: Option<String>,
    #[serde(flatten)]
    result: KeywordResult,
}

impl AlchemyResponse {
    fn into_result(self) -> Result<KeywordResult, RemoteServiceError> {
        if self.status.as_deref() == Some("ERROR") {
            let info = self.status_info.unwrap_or_else(|| "unknown error".to_string());
            return Err(RemoteServiceError::new(Some(400), info));
        }
        Ok(self.result)
    }
}

/// Client for the ranked image keywords call.
#[derive(Clone)]
pub struct AlchemyVision {
    http_client: HttpClient,
    config: AlchemyConfig,
}

impl AlchemyVision {
    pub fn new(http_client: HttpClient, config: AlchemyConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }
}

#[async_trait]
impl KeywordExtraction for AlchemyVision {
    async fn get_image_keywords(&self, image: Upload) -> Result<KeywordResult, RemoteServiceError> {
        let url = format!(
            "{}/image/ImageGetRankedImageKeywords",
            self.config.url.trim_end_matches('/')
        );
        log::debug!("Requesting keywords for '{}'", image.file_name());

        let response = self
            .http_client
            .post(url)
            .query(&[
                ("apikey", self.config.api_key.as_str()),
                ("outputMode", "json"),
                ("imagePostMode", "raw"),
            ])
            .body(image.into_body())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response.json::<AlchemyResponse>().await?.into_result()
    }
}
