use std::fmt::Write as _;
use std::sync::Arc;

use super::super::domain::{CategoryId, CategoryState};
use super::super::providers::{CompletionRequest, GenerativeBackend};

const SYSTEM_PROMPT: &str = "You are a sustainability coach. Rate how sustainable a person's \
habits are in one category. Reply with a single integer from 1 to 100 and nothing else.";

/// Optional second opinion on a rule-based category score from the generative backend.
pub struct ScoreReevaluator {
    backend: Arc<dyn GenerativeBackend>,
}

impl ScoreReevaluator {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    /// Returns the model's score, or `state.score` when the call fails or the
    /// reply holds no usable integer.
    pub async fn reevaluate(&self, category: CategoryId, state: &CategoryState) -> u8 {
        let previous = state.score;
        let mut user_prompt = format!(
            "Category: {}\nCurrent rule-based score: {previous}\nAnswers:\n",
            category.label()
        );
        for (key, value) in state.detailed_data.iter() {
            let _ = writeln!(user_prompt, "- {key}: {}", value.as_keyword());
        }

        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt,
            max_tokens: 10,
            temperature: Some(0.0),
        };

        match self.backend.complete(request).await {
            Ok(reply) => {
                let score = parse_score_reply(&reply, previous);
                tracing::debug!(%category, previous, score, "category re-evaluated");
                score
            }
            Err(err) => {
                tracing::warn!(%category, error = %err, "score re-evaluation unavailable; keeping rule score");
                previous
            }
        }
    }
}

/// First integer found in `reply` when it lies in 1..=100, otherwise `previous`.
pub fn parse_score_reply(reply: &str, previous: u8) -> u8 {
    let digits: String = reply
        .chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .take_while(|ch| ch.is_ascii_digit())
        .collect();

    match digits.parse::<u32>() {
        Ok(value) if (1..=100).contains(&value) => value as u8,
        _ => previous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_integer_in_range_is_used() {
        assert_eq!(parse_score_reply("72", 40), 72);
        assert_eq!(parse_score_reply("Score: 65/100", 40), 65);
        assert_eq!(parse_score_reply("I'd say 100.", 40), 100);
    }

    #[test]
    fn missing_or_out_of_range_values_keep_previous_score() {
        assert_eq!(parse_score_reply("no idea", 40), 40);
        assert_eq!(parse_score_reply("0", 40), 40);
        assert_eq!(parse_score_reply("150 then 60", 40), 40);
        assert_eq!(parse_score_reply("99999999999999999999", 40), 40);
    }
}
