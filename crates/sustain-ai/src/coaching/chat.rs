use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::Profile;
use super::narrative::profile_context;
use super::providers::{CompletionRequest, GenerativeBackend};

const SYSTEM_PROMPT: &str = "You are a supportive sustainability coach. Answer the user's \
message using their profile for context. Keep answers practical and under 200 words.";

const CHAT_MAX_TOKENS: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    pub degraded: bool,
}

/// Free-form coaching conversation grounded in the user's profile.
pub struct CoachingChat {
    backend: Arc<dyn GenerativeBackend>,
}

impl CoachingChat {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    pub async fn respond(&self, profile: &Profile, message: &str) -> ChatReply {
        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: format!(
                "{}\nUser message: {}",
                profile_context(profile),
                message.trim()
            ),
            max_tokens: CHAT_MAX_TOKENS,
            temperature: None,
        };

        match self.backend.complete(request).await {
            Ok(reply) if !reply.trim().is_empty() => ChatReply {
                message: reply.trim().to_string(),
                degraded: false,
            },
            Ok(_) => {
                tracing::warn!(user = %profile.user_id, "blank chat reply; using fallback");
                fallback_reply(profile)
            }
            Err(err) => {
                tracing::warn!(user = %profile.user_id, error = %err, "chat backend unavailable; using fallback");
                fallback_reply(profile)
            }
        }
    }
}

/// Points the user at their weakest assessed category.
fn fallback_reply(profile: &Profile) -> ChatReply {
    let weakest = profile
        .categories
        .iter()
        .min_by_key(|(_, state)| state.score)
        .map(|(category, state)| (category.label(), state.score));

    let message = match weakest {
        Some((label, score)) => format!(
            "I can't reach the coaching assistant right now. Your lowest score is {label} \
             at {score}/100, so that is a good place to focus next."
        ),
        None => "I can't reach the coaching assistant right now. Complete the survey for a \
                 category to get personalised guidance."
            .to_string(),
    };

    ChatReply {
        message,
        degraded: true,
    }
}
