use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// Pages served by the demo UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum View {
    Use,
    Train,
    Test,
}

/// A score we produce ourselves. Remote score entries stay as raw JSON so a
/// malformed entry can't hide the rest of its list from filtering.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Score {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier_id: Option<String>,
    pub name: String,
    pub score: f64,
}

impl From<Score> for serde_json::Value {
    fn from(score: Score) -> Self {
        let mut entry = serde_json::Map::new();
        if let Some(id) = score.classifier_id {
            entry.insert("classifier_id".to_string(), id.into());
        }
        entry.insert("name".to_string(), score.name.into());
        entry.insert("score".to_string(), score.score.into());
        serde_json::Value::Object(entry)
    }
}

/// Any array is a list of score entries; anything else is carried through untouched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Scores {
    List(Vec<serde_json::Value>),
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageScores {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Scores>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ImageScores {
    pub fn from_scores(scores: Vec<Score>) -> Self {
        Self {
            scores: Some(Scores::List(scores.into_iter().map(Into::into).collect())),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ClassificationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageScores>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageKeyword {
    #[serde(default)]
    pub text: Option<String>,
    /// Usually a numeric string such as `"0.97"`.
    #[serde(default)]
    pub score: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct KeywordResult {
    #[serde(rename = "imageKeywords", default)]
    pub image_keywords: Vec<ImageKeyword>,
}

/// Fields are kept untyped so a wrong type reports as a missing field
/// instead of a body parse error.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TrainingRequest {
    #[serde(default)]
    pub positives: Option<serde_json::Value>,
    #[serde(default)]
    pub negatives: Option<serde_json::Value>,
    #[serde(default)]
    pub name: Option<serde_json::Value>,
}

/// Descriptor returned by the remote training API. Fields we don't model are kept.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Classifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}
