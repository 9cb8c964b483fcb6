//! Sustainability coaching: survey scoring, user profiles, recommendation
//! retrieval with generative fallback, goal tracking and narrative feedback.
//!
//! The knowledge source and generative backend sit behind the traits in
//! [`providers`]; every provider failure is absorbed by a deterministic
//! fallback so callers always get a usable answer.

pub mod chat;
pub mod domain;
pub mod error;
pub mod goals;
pub mod narrative;
mod profile;
pub mod providers;
pub mod recommendations;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod survey;

#[cfg(test)]
mod tests;

pub use chat::{ChatReply, CoachingChat};
pub use domain::{
    AnswerSet, CategoryId, CategoryState, CheckIn, DetailEntry, DetailValue, DetailedData,
    Difficulty, Goal, GoalId, GoalStatus, Impact, Profile, Recommendation, RecommendationSource,
    SkillLevel, UserId,
};
pub use error::CoachingError;
pub use goals::GoalTracker;
pub use narrative::{fallback_summary, NarrativeSummarizer};
pub use providers::{
    AzureSearchClient, ChatCompletionsClient, CompletionRequest, DisabledProvider, Document,
    GenerativeBackend, KnowledgeSource, ProviderError, SearchRequest,
};
pub use recommendations::{RecommendationResolver, RecommendationSet, ServiceNotice};
pub use repository::{ProfileRepository, RepositoryError};
pub use router::coaching_router;
pub use service::{
    CategoryUpdate, CoachingServiceError, ProfileSnapshot, SustainabilityCoachService,
};
pub use survey::{SurveyImportError, SurveyImporter};
