use serde_json::Value;
use shared::{ClassificationResult, ImageKeyword, ImageScores, KeywordResult, Score, Scores};

const NO_TAGS: &str = "NO_TAGS";
const UNKNOWN: &str = "Unknown";

/// Parses the longest leading float, the way keyword scores are sent
/// (`"0.97"`, occasionally with trailing junk). Anything unusable is zero.
fn parse_score(value: Option<&Value>) -> f64 {
    let text = match value {
        Some(Value::Number(n)) => return n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim(),
        _ => return 0.0,
    };
    (1..=text.len())
        .rev()
        .filter(|&end| text.is_char_boundary(end))
        .find_map(|end| text[..end].parse::<f64>().ok())
        .filter(|score| score.is_finite())
        .unwrap_or(0.0)
}

fn keyword_to_score(keyword: &ImageKeyword) -> Score {
    let name = keyword
        .text
        .as_deref()
        .filter(|text| !text.is_empty())
        .unwrap_or(UNKNOWN);
    Score {
        classifier_id: None,
        name: name.to_string(),
        score: parse_score(keyword.score.as_ref()),
    }
}

/// Converts keyword extraction output into a single-image classification result.
pub fn normalize_keywords(result: &KeywordResult) -> ClassificationResult {
    let scores = result
        .image_keywords
        .iter()
        .map(keyword_to_score)
        .filter(|score| score.name != NO_TAGS)
        .collect();

    ClassificationResult {
        images: Some(vec![ImageScores::from_scores(scores)]),
        extra: Default::default(),
    }
}

/// An entry survives when its `classifier_id` is set and either equals its
/// `name` (builtin classifier) or is in the allow list. Entries that aren't
/// objects have no id and are dropped.
fn keep_score(entry: &Value, classifier_ids: &[String]) -> bool {
    let Some(id) = entry.get("classifier_id") else {
        return false;
    };
    entry.get("name") == Some(id)
        || id
            .as_str()
            .is_some_and(|id| classifier_ids.iter().any(|allowed| allowed == id))
}

/// Drops scores from classifiers the caller didn't ask for.
pub fn filter_user_classifiers(
    mut result: ClassificationResult,
    classifier_ids: &[String],
) -> ClassificationResult {
    let Some(images) = result.images.as_mut() else {
        return result;
    };

    for image in images.iter_mut() {
        if let Some(Scores::List(scores)) = image.scores.as_mut() {
            scores.retain(|entry| keep_score(entry, classifier_ids));
        }
    }
    result
}
