//! Shared fixtures: mock remote services and a throwaway app environment.

#![allow(dead_code)]

use async_trait::async_trait;
use recognition_demo::AppState;
use recognition_demo::config::{AppConfig, ClassifyMode};
use recognition_demo::recognition::{
    KeywordExtraction, RemoteServiceError, TrainingData, Upload, VisualRecognition,
};
use serde_json::json;
use shared::{ClassificationResult, Classifier, ImageKeyword, KeywordResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const FIXED_CLASSIFIER: &str = "Test01_1000695352";
pub const TINY_JPEG: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";

#[derive(Debug, Clone)]
pub struct ClassifyCall {
    pub file_name: String,
    pub classifier_ids: Vec<String>,
    pub existed: bool,
}

#[derive(Debug, Clone)]
pub struct TrainingCall {
    pub positive_file: String,
    pub negative_file: String,
    pub name: String,
    pub existed: bool,
}

pub struct MockRecognition {
    uploads_dir: PathBuf,
    classify_error: Option<u16>,
    training_error: Option<u16>,
    pub classify_calls: Mutex<Vec<ClassifyCall>>,
    pub training_calls: Mutex<Vec<TrainingCall>>,
}

impl MockRecognition {
    fn new(uploads_dir: PathBuf) -> Self {
        Self {
            uploads_dir,
            classify_error: None,
            training_error: None,
            classify_calls: Mutex::new(Vec::new()),
            training_calls: Mutex::new(Vec::new()),
        }
    }

    fn exists(&self, upload: &Upload) -> bool {
        self.uploads_dir.join(upload.file_name()).exists()
    }

    pub fn classify_calls(&self) -> Vec<ClassifyCall> {
        self.classify_calls.lock().unwrap().clone()
    }

    pub fn training_calls(&self) -> Vec<TrainingCall> {
        self.training_calls.lock().unwrap().clone()
    }
}

/// Scores from a builtin classifier, the fixed classifier and someone else's.
pub fn mixed_scores() -> ClassificationResult {
    serde_json::from_value(json!({
        "images": [{
            "image": "upload.jpg",
            "scores": [
                { "classifier_id": "dog", "name": "dog", "score": 0.81 },
                { "classifier_id": FIXED_CLASSIFIER, "name": "Test01", "score": 0.72 },
                { "classifier_id": "Stranger_42", "name": "stranger", "score": 0.64 }
            ]
        }]
    }))
    .unwrap()
}

#[async_trait]
impl VisualRecognition for MockRecognition {
    async fn create_classifier(
        &self,
        training: TrainingData,
    ) -> Result<Classifier, RemoteServiceError> {
        let existed = self.exists(&training.positive_examples)
            && self.exists(&training.negative_examples);
        self.training_calls.lock().unwrap().push(TrainingCall {
            positive_file: training.positive_examples.file_name().to_string(),
            negative_file: training.negative_examples.file_name().to_string(),
            name: training.name.clone(),
            existed,
        });

        if let Some(status) = self.training_error {
            return Err(RemoteServiceError::new(Some(status), "training rejected"));
        }
        Ok(serde_json::from_value(json!({
            "classifier_id": format!("{}_1234", training.name),
            "name": training.name,
            "owner": "demo",
            "created": "2016-01-01T00:00:00.000Z"
        }))
        .unwrap())
    }

    async fn classify(
        &self,
        image: Upload,
        classifier_ids: &[String],
    ) -> Result<ClassificationResult, RemoteServiceError> {
        self.classify_calls.lock().unwrap().push(ClassifyCall {
            file_name: image.file_name().to_string(),
            classifier_ids: classifier_ids.to_vec(),
            existed: self.exists(&image),
        });

        if let Some(status) = self.classify_error {
            return Err(RemoteServiceError::new(Some(status), "classifier not found"));
        }
        Ok(mixed_scores())
    }
}

#[derive(Default)]
pub struct MockKeywords {
    pub calls: Mutex<usize>,
}

#[async_trait]
impl KeywordExtraction for MockKeywords {
    async fn get_image_keywords(&self, _image: Upload) -> Result<KeywordResult, RemoteServiceError> {
        *self.calls.lock().unwrap() += 1;
        Ok(KeywordResult {
            image_keywords: vec![
                ImageKeyword {
                    text: Some("cat".into()),
                    score: Some(json!("0.93")),
                },
                ImageKeyword {
                    text: Some("NO_TAGS".into()),
                    score: Some(json!("0")),
                },
                ImageKeyword {
                    text: None,
                    score: None,
                },
            ],
        })
    }
}

pub struct TestEnv {
    pub uploads: TempDir,
    pub statics: TempDir,
    pub views: TempDir,
    pub recognition: Arc<MockRecognition>,
    pub keywords: Arc<MockKeywords>,
    pub state: AppState,
}

pub struct EnvOptions {
    pub mode: ClassifyMode,
    pub classify_error: Option<u16>,
    pub training_error: Option<u16>,
    pub max_upload_bytes: Option<usize>,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            mode: ClassifyMode::Fixed,
            classify_error: None,
            training_error: None,
            max_upload_bytes: None,
        }
    }
}

pub fn test_env(options: EnvOptions) -> TestEnv {
    let uploads = tempfile::tempdir().unwrap();
    let statics = tempfile::tempdir().unwrap();
    let views = tempfile::tempdir().unwrap();

    std::fs::create_dir(statics.path().join("images")).unwrap();
    std::fs::write(statics.path().join("images/test.jpg"), b"local jpeg").unwrap();
    for view in ["use", "train", "test"] {
        std::fs::write(
            views.path().join(format!("{}.html", view)),
            format!("<html><body>{}</body></html>", view),
        )
        .unwrap();
    }

    let mut config = AppConfig::default();
    config.storage.uploads_dir = uploads.path().to_path_buf();
    config.storage.static_dir = statics.path().to_path_buf();
    config.storage.views_dir = views.path().to_path_buf();
    if let Some(limit) = options.max_upload_bytes {
        config.storage.max_upload_bytes = limit;
    }
    config.classify.mode = options.mode;
    config.classify.classifier_ids = vec![FIXED_CLASSIFIER.to_string()];

    let mut recognition = MockRecognition::new(uploads.path().to_path_buf());
    recognition.classify_error = options.classify_error;
    recognition.training_error = options.training_error;
    let recognition = Arc::new(recognition);
    let keywords = Arc::new(MockKeywords::default());

    let state = AppState::new(
        &config,
        reqwest::Client::new(),
        recognition.clone(),
        keywords.clone(),
    );

    TestEnv {
        uploads,
        statics,
        views,
        recognition,
        keywords,
        state,
    }
}

pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

pub fn images(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                TINY_JPEG.to_string()
            } else {
                "images/test.jpg".to_string()
            }
        })
        .collect()
}

pub const BOUNDARY: &str = "----demo-boundary";

/// Builds a multipart body; a part with a file name is sent as a file.
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
