use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::coaching::domain::{AnswerSet, DetailValue, Profile, UserId};
use crate::coaching::providers::{
    CompletionRequest, Document, GenerativeBackend, KnowledgeSource, ProviderError, SearchRequest,
};
use crate::coaching::repository::{ProfileRepository, RepositoryError};
use crate::coaching::{coaching_router, SustainabilityCoachService};
use crate::config::{CoachingConfig, RecommendationConfig};

pub(super) fn answers(pairs: &[(&str, &str)]) -> AnswerSet {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), DetailValue::from(*value)))
        .collect()
}

pub(super) fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn document(title: &str, category: &str) -> Document {
    match json!({
        "title": title,
        "description": format!("{title} for {category}."),
        "difficulty": "medium",
        "impact": "high",
        "category": category,
    }) {
        Value::Object(map) => map,
        _ => unreachable!("object literal"),
    }
}

pub(super) fn generated_reply(count: usize) -> String {
    let items: Vec<Value> = (1..=count)
        .map(|index| {
            json!({
                "title": format!("Generated tip {index}"),
                "description": format!("Generated description {index}."),
                "difficulty": "easy",
                "impact": "medium",
            })
        })
        .collect();
    Value::Array(items).to_string()
}

pub(super) fn upstream_failure(provider: &str) -> ProviderError {
    ProviderError::RequestFailed {
        provider: provider.to_string(),
        reason: "connection refused".to_string(),
    }
}

/// Knowledge source returning a fixed result and recording every request.
pub(super) struct ScriptedKnowledge {
    response: Result<Vec<Document>, ProviderError>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedKnowledge {
    pub(super) fn returning(documents: Vec<Document>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(documents),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(super) fn failing() -> Arc<Self> {
        Arc::new(Self {
            response: Err(upstream_failure("search")),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(super) fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

#[async_trait]
impl KnowledgeSource for ScriptedKnowledge {
    async fn search(&self, request: SearchRequest) -> Result<Vec<Document>, ProviderError> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(request);
        tokio::task::yield_now().await;
        self.response.clone()
    }
}

/// Generative backend answering from a queue; an exhausted queue fails.
#[derive(Default)]
pub(super) struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedGenerator {
    pub(super) fn replying<I>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Result<String, ProviderError>>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(super) fn unavailable() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(super) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedGenerator {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(request);
        tokio::task::yield_now().await;
        self.replies
            .lock()
            .expect("reply queue poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(upstream_failure("completion")))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) profiles: Arc<Mutex<HashMap<UserId, Profile>>>,
}

impl ProfileRepository for MemoryRepository {
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
        guard.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    fn fetch(&self, user_id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        let guard = self.profiles.lock().expect("repository mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl ProfileRepository for UnavailableRepository {
    fn insert(&self, _profile: Profile) -> Result<Profile, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _profile: Profile) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _user_id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn coaching_config() -> CoachingConfig {
    CoachingConfig {
        recommendations: RecommendationConfig::default(),
        llm_rescoring: false,
    }
}

pub(super) fn build_service(
    knowledge: Arc<ScriptedKnowledge>,
    generator: Arc<ScriptedGenerator>,
    config: CoachingConfig,
) -> (
    SustainabilityCoachService<MemoryRepository>,
    Arc<MemoryRepository>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let service =
        SustainabilityCoachService::new(repository.clone(), knowledge, generator, config);
    (service, repository)
}

/// Service whose providers both fail, exercising the deterministic paths.
pub(super) fn offline_service() -> (
    SustainabilityCoachService<MemoryRepository>,
    Arc<MemoryRepository>,
) {
    build_service(
        ScriptedKnowledge::failing(),
        ScriptedGenerator::unavailable(),
        coaching_config(),
    )
}

pub(super) fn router_with_service(
    service: SustainabilityCoachService<MemoryRepository>,
) -> axum::Router {
    coaching_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
