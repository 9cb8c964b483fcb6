use std::sync::Arc;

use super::schema::{from_document, parse_generated};
use super::{RecommendationSet, ServiceNotice};
use crate::coaching::domain::{
    CategoryId, Difficulty, Impact, Recommendation, RecommendationSource, SkillLevel,
};
use crate::coaching::error::CoachingError;
use crate::coaching::providers::{
    CompletionRequest, GenerativeBackend, KnowledgeSource, SearchRequest,
};
use crate::config::RecommendationConfig;

const SELECT_FIELDS: [&str; 5] = ["title", "description", "difficulty", "impact", "category"];
const GENERATION_MAX_TOKENS: u32 = 800;

const GENERATION_SYSTEM_PROMPT: &str = "You are a sustainability coach. Suggest concrete, \
practical actions. Respond with a JSON array only. Each element must be an object with the \
string fields \"title\", \"description\", \"difficulty\" (easy, medium or hard) and \
\"impact\" (low, medium or high).";

/// Builds the recommendation list for one category at one score.
pub struct RecommendationResolver {
    knowledge: Arc<dyn KnowledgeSource>,
    generator: Arc<dyn GenerativeBackend>,
    config: RecommendationConfig,
}

impl RecommendationResolver {
    pub fn new(
        knowledge: Arc<dyn KnowledgeSource>,
        generator: Arc<dyn GenerativeBackend>,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            knowledge,
            generator,
            config,
        }
    }

    pub async fn resolve(&self, category: CategoryId, score: u8) -> RecommendationSet {
        let cap = self.config.cap.max(1);
        let mut notices = Vec::new();

        let (mut recommendations, generation_count) = match self.primary(category, score).await {
            Ok(primary) => {
                let needed = if primary.len() < self.config.min_primary_results {
                    self.config
                        .generation_quota
                        .min(cap.saturating_sub(primary.len()))
                } else {
                    0
                };
                (primary, needed)
            }
            Err(err) => {
                tracing::warn!(%category, error = %err, "knowledge source unavailable; generating instead");
                notices.push(ServiceNotice::KnowledgeSourceUnavailable);
                (Vec::new(), self.config.generation_quota.min(cap))
            }
        };

        if generation_count > 0 {
            match self.generate(category, score, generation_count).await {
                Ok(generated) => {
                    recommendations.extend(generated.into_iter().take(generation_count))
                }
                Err(err) => {
                    tracing::warn!(%category, error = %err, "generation unavailable; using placeholder");
                    notices.push(ServiceNotice::GenerationUnavailable);
                    recommendations.push(placeholder(category, score));
                }
            }
        }

        if recommendations.is_empty() {
            // No primary hits and nothing requested; keep the list non-empty.
            recommendations.push(placeholder(category, score));
        }
        recommendations.truncate(cap);

        tracing::debug!(
            %category,
            score,
            count = recommendations.len(),
            degraded = !notices.is_empty(),
            "recommendations resolved"
        );

        RecommendationSet {
            recommendations,
            degraded: !notices.is_empty(),
            notices,
        }
    }

    async fn primary(
        &self,
        category: CategoryId,
        score: u8,
    ) -> Result<Vec<Recommendation>, CoachingError> {
        let (low, high) = score_window(score, self.config.score_window);
        let request = SearchRequest {
            query: format!("{} sustainability recommendations", category.label()),
            filter: Some(format!(
                "category eq '{}' and target_score ge {low} and target_score le {high}",
                category.key()
            )),
            select: SELECT_FIELDS.iter().map(|field| field.to_string()).collect(),
            top: self.config.cap,
        };

        let documents = self.knowledge.search(request).await?;
        Ok(documents
            .iter()
            .filter_map(|document| from_document(document, category))
            .collect())
    }

    async fn generate(
        &self,
        category: CategoryId,
        score: u8,
        count: usize,
    ) -> Result<Vec<Recommendation>, CoachingError> {
        let level = SkillLevel::for_score(score);
        let request = CompletionRequest {
            system_prompt: GENERATION_SYSTEM_PROMPT.to_string(),
            user_prompt: format!(
                "Give {count} recommendations to improve {} habits for a person at the {} \
                 level whose current score is {score}/100.",
                category.label().to_lowercase(),
                level.label()
            ),
            max_tokens: GENERATION_MAX_TOKENS,
            temperature: None,
        };

        let reply = self.generator.complete(request).await?;
        parse_generated(&reply, category, level)
    }
}

/// Inclusive score range around `score`, clamped to 0..=100.
fn score_window(score: u8, half_width: u8) -> (u8, u8) {
    let score = score.min(100);
    (
        score.saturating_sub(half_width),
        score.saturating_add(half_width).min(100),
    )
}

/// Deterministic fallback advice for a category.
pub fn placeholder(category: CategoryId, score: u8) -> Recommendation {
    let (title, description) = match category {
        CategoryId::Transportation => (
            "Replace one car trip a week",
            "Pick a regular short journey and walk, cycle or take public transport instead.",
        ),
        CategoryId::EnergyUsage => (
            "Cut standby power",
            "Switch appliances off at the wall and move to LED bulbs where you can.",
        ),
        CategoryId::WaterUsage => (
            "Shorten your showers",
            "Aim for showers under five minutes and fix any dripping taps.",
        ),
        CategoryId::WasteManagement => (
            "Sort your recycling",
            "Set up separate bins for recycling and compost to keep waste out of landfill.",
        ),
        CategoryId::FoodConsumption => (
            "Plan meat-free days",
            "Choose two days a week for plant-based meals and plan portions to avoid waste.",
        ),
    };

    Recommendation {
        title: title.to_string(),
        description: description.to_string(),
        difficulty: Difficulty::Easy,
        impact: Impact::Medium,
        category,
        source: RecommendationSource::Placeholder,
        level: Some(SkillLevel::for_score(score)),
    }
}
