//! Recommendation retrieval: knowledge base first, generative backend to fill
//! the gap, deterministic placeholder as the last resort.

mod resolver;
mod schema;

pub use resolver::{placeholder, RecommendationResolver};
pub use schema::{from_document, parse_generated};

use serde::{Deserialize, Serialize};

use super::domain::Recommendation;

/// Why a resolution fell back to a lesser source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceNotice {
    KnowledgeSourceUnavailable,
    GenerationUnavailable,
}

impl ServiceNotice {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KnowledgeSourceUnavailable => "knowledge_source_unavailable",
            Self::GenerationUnavailable => "generation_unavailable",
        }
    }
}

/// Outcome of a single resolution. `recommendations` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<ServiceNotice>,
}
