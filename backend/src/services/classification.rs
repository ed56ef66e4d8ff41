use shared::ClassificationResult;
use std::sync::Arc;

use super::image_resolver::{ClassifyRequest, ImageResolver, ResolvedImage};
use crate::config::{ClassifyMode, ClassifySettings};
use crate::error::AppError;
use crate::recognition::{KeywordExtraction, RemoteServiceError, Upload, VisualRecognition};
use crate::results::{filter_user_classifiers, normalize_keywords};

#[derive(Clone)]
pub struct ClassificationService {
    resolver: ImageResolver,
    recognition: Arc<dyn VisualRecognition>,
    keywords: Arc<dyn KeywordExtraction>,
    settings: ClassifySettings,
}

enum Route {
    Classifiers(Vec<String>),
    Keywords,
}

impl ClassificationService {
    pub fn new(
        resolver: ImageResolver,
        recognition: Arc<dyn VisualRecognition>,
        keywords: Arc<dyn KeywordExtraction>,
        settings: ClassifySettings,
    ) -> Self {
        Self {
            resolver,
            recognition,
            keywords,
            settings,
        }
    }

    fn route(&self, requested: Option<&str>) -> Route {
        match self.settings.mode {
            ClassifyMode::Fixed => Route::Classifiers(self.settings.classifier_ids.clone()),
            ClassifyMode::Keywords => Route::Keywords,
            ClassifyMode::Request => match requested {
                Some(id) => Route::Classifiers(vec![id.to_string()]),
                None => Route::Keywords,
            },
        }
    }

    async fn call_remote(
        &self,
        route: &Route,
        upload: Upload,
    ) -> Result<ClassificationResult, RemoteServiceError> {
        match route {
            Route::Classifiers(ids) => {
                let result = self.recognition.classify(upload, ids).await?;
                Ok(filter_user_classifiers(result, ids))
            }
            Route::Keywords => {
                let keywords = self.keywords.get_image_keywords(upload).await?;
                Ok(normalize_keywords(&keywords))
            }
        }
    }

    /// Resolves the image, runs it through the configured service and deletes
    /// any scratch file before returning.
    pub async fn classify(&self, request: ClassifyRequest) -> Result<ClassificationResult, AppError> {
        let route = self.route(request.classifier_id.as_deref());
        let ResolvedImage {
            kind,
            upload,
            artifact,
        } = self.resolver.resolve(request).await?;
        log::debug!("Image source: {:?}", kind);

        let outcome = self.call_remote(&route, upload).await;

        if let Some(artifact) = artifact {
            artifact.remove().await;
        }

        outcome.map_err(|e| {
            log::error!("Classification failed: {}", e);
            AppError::Remote(e)
        })
    }
}
