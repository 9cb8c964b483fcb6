use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use sustain_ai::coaching::survey::parse_answer;
use sustain_ai::coaching::{
    AzureSearchClient, ChatCompletionsClient, CoachingError, DetailValue, DisabledProvider,
    GenerativeBackend, KnowledgeSource, Profile, ProfileRepository, ProviderError,
    RepositoryError, SustainabilityCoachService, UserId,
};
use sustain_ai::config::{AppConfig, ProviderConfig};
use sustain_ai::error::AppError;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryProfileRepository {
    profiles: Arc<Mutex<HashMap<UserId, Profile>>>,
}

impl ProfileRepository for InMemoryProfileRepository {
    fn insert(&self, profile: Profile) -> Result<Profile, RepositoryError> {
        let mut guard = self.profiles.lock().expect("repository mutex poisoned");
        if guard.contains_key(&profile.user_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }

    fn update(&self, profile: Profile) -> Result<(), RepositoryError> {
        let mut guard = self.profiles.lock().expect("repository mutex poisoned");
        if guard.contains_key(&profile.user_id) {
            guard.insert(profile.user_id.clone(), profile);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, user_id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        let guard = self.profiles.lock().expect("repository mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }
}

pub(crate) type CoachService = SustainabilityCoachService<InMemoryProfileRepository>;

/// Concrete provider adapters for the configured sections; anything left
/// unconfigured is served by [`DisabledProvider`].
pub(crate) fn build_providers(
    config: &ProviderConfig,
) -> Result<(Arc<dyn KnowledgeSource>, Arc<dyn GenerativeBackend>), ProviderError> {
    let knowledge: Arc<dyn KnowledgeSource> = match &config.search {
        Some(search) => {
            info!(endpoint = %search.endpoint, index = %search.index, "knowledge source enabled");
            Arc::new(AzureSearchClient::new(search.clone(), config.timeout)?)
        }
        None => Arc::new(DisabledProvider::knowledge_source()),
    };

    let generator: Arc<dyn GenerativeBackend> = match &config.completion {
        Some(completion) => {
            info!(base_url = %completion.base_url, model = %completion.model, "generative backend enabled");
            Arc::new(ChatCompletionsClient::new(completion.clone(), config.timeout)?)
        }
        None => Arc::new(DisabledProvider::generative_backend()),
    };

    Ok((knowledge, generator))
}

pub(crate) fn build_service(config: &AppConfig) -> Result<CoachService, AppError> {
    let (knowledge, generator) =
        build_providers(&config.providers).map_err(CoachingError::from)?;
    Ok(SustainabilityCoachService::new(
        Arc::new(InMemoryProfileRepository::default()),
        knowledge,
        generator,
        config.coaching.clone(),
    ))
}

/// Parse a `question=answer` command-line pair.
pub(crate) fn parse_answer_pair(raw: &str) -> Result<(String, DetailValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION=ANSWER, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing question key in '{raw}'"));
    }
    Ok((key.to_string(), parse_answer(value)))
}
