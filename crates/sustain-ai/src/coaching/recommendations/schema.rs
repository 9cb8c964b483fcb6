//! Strict validation of recommendation payloads coming from untrusted sources
//! (model output and loosely typed index documents).

use serde::Deserialize;
use serde_json::Value;

use super::super::domain::{
    CategoryId, Difficulty, Impact, Recommendation, RecommendationSource, SkillLevel,
};
use super::super::error::CoachingError;
use super::super::providers::Document;

const MAX_TITLE_CHARS: usize = 120;
const MAX_DESCRIPTION_CHARS: usize = 1_000;

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    title: String,
    description: String,
    difficulty: String,
    impact: String,
    #[serde(default)]
    category: Option<String>,
}

impl RawRecommendation {
    fn validate(
        self,
        category: CategoryId,
        source: RecommendationSource,
        level: Option<SkillLevel>,
    ) -> Result<Recommendation, String> {
        let title = self.title.trim();
        let description = self.description.trim();
        if title.is_empty() {
            return Err("title is empty".to_string());
        }
        if description.is_empty() {
            return Err("description is empty".to_string());
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err("title is too long".to_string());
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err("description is too long".to_string());
        }

        if let Some(declared) = self.category.as_deref() {
            match declared.parse::<CategoryId>() {
                Ok(parsed) if parsed == category => {}
                Ok(parsed) => return Err(format!("belongs to category {parsed}")),
                Err(err) => return Err(err.to_string()),
            }
        }

        Ok(Recommendation {
            title: title.to_string(),
            description: description.to_string(),
            difficulty: self.difficulty.parse::<Difficulty>()?,
            impact: self.impact.parse::<Impact>()?,
            category,
            source,
            level,
        })
    }
}

/// Parse model output into recommendations.
///
/// Accepts a bare JSON array, a fenced ```json block, or the outermost `[...]`
/// span of the reply. Invalid items are dropped; the output is rejected when no
/// item survives.
pub fn parse_generated(
    reply: &str,
    category: CategoryId,
    level: SkillLevel,
) -> Result<Vec<Recommendation>, CoachingError> {
    let items = extract_array(reply).ok_or_else(|| {
        CoachingError::UnparsableGenerativeOutput("reply does not contain a JSON array".to_string())
    })?;

    let mut recommendations = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let validated = serde_json::from_value::<RawRecommendation>(item)
            .map_err(|err| err.to_string())
            .and_then(|raw| raw.validate(category, RecommendationSource::Generated, Some(level)));
        match validated {
            Ok(recommendation) => recommendations.push(recommendation),
            Err(reason) => {
                tracing::debug!(index, %reason, "dropping invalid generated recommendation")
            }
        }
    }

    if recommendations.is_empty() {
        return Err(CoachingError::UnparsableGenerativeOutput(
            "no valid recommendation in reply".to_string(),
        ));
    }

    Ok(recommendations)
}

/// Map an index document to a recommendation, or `None` if it does not match the schema.
pub fn from_document(document: &Document, category: CategoryId) -> Option<Recommendation> {
    let raw = serde_json::from_value::<RawRecommendation>(Value::Object(document.clone()));
    match raw.map_err(|err| err.to_string()).and_then(|raw| {
        raw.validate(category, RecommendationSource::KnowledgeBase, None)
    }) {
        Ok(recommendation) => Some(recommendation),
        Err(reason) => {
            tracing::warn!(%category, %reason, "skipping malformed knowledge-base document");
            None
        }
    }
}

fn extract_array(reply: &str) -> Option<Vec<Value>> {
    let trimmed = reply.trim();
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
        return Some(items);
    }

    if let Some(fenced) = fenced_block(trimmed) {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(fenced) {
            return Some(items);
        }
    }

    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = after_fence.find('\n').map(|idx| idx + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}
