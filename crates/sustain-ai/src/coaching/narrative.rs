use std::fmt::Write as _;
use std::sync::Arc;

use super::domain::Profile;
use super::providers::{CompletionRequest, GenerativeBackend};

const SYSTEM_PROMPT: &str = "You are a friendly sustainability coach. Write a short, \
encouraging summary (at most three paragraphs) of the person's sustainability profile. \
Mention their strongest and weakest categories and their open goals.";

const SUMMARY_MAX_TOKENS: u32 = 400;

/// Turns a profile into a readable coaching summary.
pub struct NarrativeSummarizer {
    backend: Arc<dyn GenerativeBackend>,
}

impl NarrativeSummarizer {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    /// Never fails: backend errors and blank replies yield [`fallback_summary`].
    pub async fn summarize(&self, profile: &Profile) -> String {
        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: profile_context(profile),
            max_tokens: SUMMARY_MAX_TOKENS,
            temperature: None,
        };

        match self.backend.complete(request).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                tracing::warn!(user = %profile.user_id, "blank narrative reply; using fallback summary");
                fallback_summary(profile)
            }
            Err(err) => {
                tracing::warn!(user = %profile.user_id, error = %err, "narrative backend unavailable; using fallback summary");
                fallback_summary(profile)
            }
        }
    }
}

pub fn fallback_summary(profile: &Profile) -> String {
    let assessed = profile.categories.len();
    let noun = if assessed == 1 {
        "category"
    } else {
        "categories"
    };
    format!(
        "Your overall sustainability score is {}/100 across {assessed} assessed {noun}.",
        profile.overall_score()
    )
}

/// Plain-text rendering of scores and open goals shared by the prompts.
pub(crate) fn profile_context(profile: &Profile) -> String {
    let mut context = format!("Overall score: {}/100\nCategory scores:\n", profile.overall_score());
    if profile.categories.is_empty() {
        context.push_str("- none assessed yet\n");
    }
    for (category, state) in &profile.categories {
        let _ = writeln!(context, "- {}: {}/100", category.label(), state.score);
    }

    context.push_str("Active goals:\n");
    let mut has_goals = false;
    for goal in profile.active_goals() {
        has_goals = true;
        let _ = writeln!(
            context,
            "- [{}] {} ({}, {}% complete)",
            goal.category.label(),
            goal.description,
            goal.status.label(),
            goal.progress
        );
    }
    if !has_goals {
        context.push_str("- none\n");
    }

    context
}
