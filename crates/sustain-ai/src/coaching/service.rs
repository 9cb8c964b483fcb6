use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::chat::{ChatReply, CoachingChat};
use super::domain::{AnswerSet, CategoryId, CategoryState, Goal, GoalId, Profile, UserId};
use super::error::CoachingError;
use super::goals::GoalTracker;
use super::narrative::NarrativeSummarizer;
use super::providers::{GenerativeBackend, KnowledgeSource};
use super::recommendations::{RecommendationResolver, RecommendationSet, ServiceNotice};
use super::repository::{ProfileRepository, RepositoryError};
use super::scoring::ScoreReevaluator;
use crate::config::CoachingConfig;

/// Profile together with the fallback annotations collected while building it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub profile: Profile,
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<ServiceNotice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub category: CategoryId,
    pub state: CategoryState,
    pub overall_score: u8,
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<ServiceNotice>,
}

/// Service composing profile storage, scoring and the provider-backed helpers.
///
/// Mutations for one user are serialized: each holds that user's lock for the
/// whole read-modify-write, including provider calls. A user's entry leaves the
/// lock table as soon as no operation holds or awaits it.
pub struct SustainabilityCoachService<R> {
    repository: Arc<R>,
    resolver: RecommendationResolver,
    summarizer: NarrativeSummarizer,
    chat: CoachingChat,
    reevaluator: Option<ScoreReevaluator>,
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl<R> SustainabilityCoachService<R>
where
    R: ProfileRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        knowledge: Arc<dyn KnowledgeSource>,
        generator: Arc<dyn GenerativeBackend>,
        config: CoachingConfig,
    ) -> Self {
        let reevaluator = config
            .llm_rescoring
            .then(|| ScoreReevaluator::new(generator.clone()));

        Self {
            repository,
            resolver: RecommendationResolver::new(
                knowledge,
                generator.clone(),
                config.recommendations,
            ),
            summarizer: NarrativeSummarizer::new(generator.clone()),
            chat: CoachingChat::new(generator),
            reevaluator,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a profile from an initial survey and attach recommendations to
    /// every assessed category.
    pub async fn create_profile(
        &self,
        user_id: UserId,
        initial_answers: AnswerSet,
    ) -> Result<ProfileSnapshot, CoachingServiceError> {
        let _lock = self.lock_user(&user_id).await;

        if self.repository.fetch(&user_id)?.is_some() {
            return Err(CoachingError::ProfileExists(user_id).into());
        }

        let now = Utc::now();
        let mut profile = Profile::create(user_id.clone(), initial_answers, now);
        let mut notices = Vec::new();
        let assessed: Vec<(CategoryId, u8)> = profile
            .categories
            .iter()
            .map(|(category, state)| (*category, state.score))
            .collect();

        for (category, score) in assessed {
            let resolved = self.resolver.resolve(category, score).await;
            merge_notices(&mut notices, &resolved.notices);
            profile.set_recommendations(category, resolved.recommendations, now)?;
        }

        let stored = self.repository.insert(profile).map_err(|err| match err {
            RepositoryError::Conflict => CoachingError::ProfileExists(user_id.clone()).into(),
            other => CoachingServiceError::from(other),
        })?;

        tracing::info!(
            user = %user_id,
            categories = stored.categories.len(),
            overall_score = stored.overall_score(),
            "profile created"
        );

        Ok(ProfileSnapshot {
            profile: stored,
            degraded: !notices.is_empty(),
            notices,
        })
    }

    pub async fn get_profile(&self, user_id: &UserId) -> Result<Profile, CoachingServiceError> {
        self.load(user_id)
    }

    /// Merge answers into a category, optionally re-score it with the
    /// generative backend, and refresh its recommendations.
    pub async fn update_category(
        &self,
        user_id: &UserId,
        category: &str,
        new_data: AnswerSet,
    ) -> Result<CategoryUpdate, CoachingServiceError> {
        let category: CategoryId = category.parse()?;
        let _lock = self.lock_user(user_id).await;

        let mut profile = self.load(user_id)?;
        let now = Utc::now();
        let state = profile.update(category, new_data, now).clone();

        if let Some(reevaluator) = &self.reevaluator {
            let rescored = reevaluator.reevaluate(category, &state).await;
            if rescored != state.score {
                profile.override_score(category, rescored, now)?;
            }
        }

        let score = profile.category(category)?.score;
        let resolved = self.resolver.resolve(category, score).await;
        profile.set_recommendations(category, resolved.recommendations, now)?;

        let overall_score = profile.overall_score();
        let state = profile.category(category)?.clone();
        self.repository.update(profile)?;

        tracing::info!(user = %user_id, %category, score = state.score, overall_score, "category updated");

        Ok(CategoryUpdate {
            category,
            state,
            overall_score,
            degraded: resolved.degraded,
            notices: resolved.notices,
        })
    }

    /// Fresh recommendations for an assessed category. Nothing is persisted.
    pub async fn recommendations(
        &self,
        user_id: &UserId,
        category: &str,
    ) -> Result<RecommendationSet, CoachingServiceError> {
        let category: CategoryId = category.parse()?;
        let profile = self.load(user_id)?;
        let score = profile.category(category)?.score;
        Ok(self.resolver.resolve(category, score).await)
    }

    pub async fn add_goal(
        &self,
        user_id: &UserId,
        category: &str,
        description: String,
        target_date: Option<NaiveDate>,
    ) -> Result<Goal, CoachingServiceError> {
        let category: CategoryId = category.parse()?;
        let _lock = self.lock_user(user_id).await;

        let mut profile = self.load(user_id)?;
        let goal = GoalTracker::new(&mut profile).add_goal(
            category,
            description,
            target_date,
            Utc::now(),
        );
        self.repository.update(profile)?;

        tracing::info!(user = %user_id, goal = %goal.id, %category, "goal added");
        Ok(goal)
    }

    pub async fn record_progress(
        &self,
        user_id: &UserId,
        goal_id: &GoalId,
        progress_value: u8,
        notes: Option<String>,
    ) -> Result<Goal, CoachingServiceError> {
        let _lock = self.lock_user(user_id).await;

        let mut profile = self.load(user_id)?;
        let goal = GoalTracker::new(&mut profile).record_progress(
            goal_id,
            progress_value,
            notes,
            Utc::now(),
        )?;
        self.repository.update(profile)?;

        tracing::info!(
            user = %user_id,
            goal = %goal.id,
            progress = goal.progress,
            status = goal.status.label(),
            "goal progress recorded"
        );
        Ok(goal)
    }

    pub async fn summarize(&self, user_id: &UserId) -> Result<String, CoachingServiceError> {
        let profile = self.load(user_id)?;
        Ok(self.summarizer.summarize(&profile).await)
    }

    pub async fn chat(
        &self,
        user_id: &UserId,
        message: &str,
    ) -> Result<ChatReply, CoachingServiceError> {
        let profile = self.load(user_id)?;
        Ok(self.chat.respond(&profile, message).await)
    }

    fn load(&self, user_id: &UserId) -> Result<Profile, CoachingServiceError> {
        self.repository
            .fetch(user_id)?
            .ok_or_else(|| CoachingError::ProfileNotFound(user_id.clone()).into())
    }

    async fn lock_user(&self, user_id: &UserId) -> UserLock<'_> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(user_id.clone()).or_default().clone()
        };
        let guard = mutex.lock_owned().await;

        UserLock {
            locks: &self.locks,
            user_id: user_id.clone(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Held for the duration of one mutation; prunes the table entry on release.
struct UserLock<'a> {
    locks: &'a Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks
            .get(&self.user_id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1);
        if idle {
            locks.remove(&self.user_id);
        }
    }
}

fn merge_notices(into: &mut Vec<ServiceNotice>, notices: &[ServiceNotice]) {
    for notice in notices {
        if !into.contains(notice) {
            into.push(*notice);
        }
    }
}

/// Error raised by the coaching service.
#[derive(Debug, thiserror::Error)]
pub enum CoachingServiceError {
    #[error(transparent)]
    Coaching(#[from] CoachingError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CoachingServiceError {
    /// Stable machine-readable identifier used in API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            CoachingServiceError::Coaching(err) => err.kind(),
            CoachingServiceError::Repository(RepositoryError::Conflict) => "conflict",
            CoachingServiceError::Repository(RepositoryError::NotFound) => "not_found",
            CoachingServiceError::Repository(RepositoryError::Unavailable(_)) => {
                "repository_unavailable"
            }
        }
    }
}
