mod reevaluate;
mod rules;

pub use reevaluate::{parse_score_reply, ScoreReevaluator};
pub(crate) use rules::category_for_question;

use super::domain::{AnswerSet, CategoryId, DetailValue, DetailedData};
use super::error::CoachingError;
use serde::Serialize;

/// Score assigned when a category has no relevant answers yet.
pub const NEUTRAL_SCORE: u8 = 50;

/// Read access to answers, implemented by raw answer sets and merged category data.
pub trait Answers {
    fn answer(&self, key: &str) -> Option<&DetailValue>;
}

impl Answers for AnswerSet {
    fn answer(&self, key: &str) -> Option<&DetailValue> {
        self.get(key)
    }
}

impl Answers for DetailedData {
    fn answer(&self, key: &str) -> Option<&DetailValue> {
        self.get(key)
    }
}

/// Per-question audit trail for a category score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOutcome {
    pub question: &'static str,
    pub sustainable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryAssessment {
    pub category: CategoryId,
    pub score: u8,
    pub outcomes: Vec<QuestionOutcome>,
}

impl CategoryAssessment {
    pub fn answered(&self) -> usize {
        self.outcomes.len()
    }

    pub fn sustainable(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.sustainable)
            .count()
    }
}

/// Score a category by name. Unknown names yield `CategoryNotFound`.
pub fn score<A: Answers + ?Sized>(category: &str, answers: &A) -> Result<u8, CoachingError> {
    let category: CategoryId = category.parse()?;
    Ok(assess(category, answers).score)
}

pub fn assess<A: Answers + ?Sized>(category: CategoryId, answers: &A) -> CategoryAssessment {
    let outcomes: Vec<QuestionOutcome> = rules::rules_for(category)
        .iter()
        .filter_map(|rule| {
            answers.answer(rule.key).map(|value| QuestionOutcome {
                question: rule.key,
                sustainable: rule.predicate.is_sustainable(value),
            })
        })
        .collect();

    let score = if outcomes.is_empty() {
        NEUTRAL_SCORE
    } else {
        let sustainable = outcomes.iter().filter(|outcome| outcome.sustainable).count();
        ratio_score(sustainable, outcomes.len())
    };

    CategoryAssessment {
        category,
        score,
        outcomes,
    }
}

/// Rounded mean of category scores, `0` when there are none.
pub fn overall_score<I>(scores: I) -> u8
where
    I: IntoIterator<Item = u8>,
{
    let (total, count) = scores
        .into_iter()
        .fold((0u32, 0u32), |(total, count), score| {
            (total + u32::from(score), count + 1)
        });

    if count == 0 {
        return 0;
    }

    (f64::from(total) / f64::from(count)).round().clamp(0.0, 100.0) as u8
}

fn ratio_score(sustainable: usize, answered: usize) -> u8 {
    ((sustainable as f64 / answered as f64) * 100.0)
        .round()
        .clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(&str, &str)]) -> AnswerSet {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), DetailValue::from(*value)))
            .collect()
    }

    #[test]
    fn sustainable_commuter_scores_full_transportation_marks() {
        let answers = answers(&[
            ("transport_primary_mode", "cycling"),
            ("commute_distance", "5"),
            ("flights_per_year", "1"),
        ]);

        assert_eq!(score("transportation", &answers).expect("known category"), 100);
    }

    #[test]
    fn no_relevant_answers_yields_neutral_score() {
        for category in CategoryId::ordered() {
            let unrelated = answers(&[("favourite_colour", "green")]);
            assert_eq!(assess(category, &unrelated).score, NEUTRAL_SCORE);
            assert_eq!(assess(category, &AnswerSet::new()).score, NEUTRAL_SCORE);
        }
    }

    #[test]
    fn partial_answers_round_to_nearest_integer() {
        let answers = answers(&[
            ("transport_primary_mode", "car"),
            ("commute_distance", "25"),
            ("flights_per_year", "0"),
        ]);

        let assessment = assess(CategoryId::Transportation, &answers);
        assert_eq!(assessment.answered(), 3);
        assert_eq!(assessment.sustainable(), 1);
        assert_eq!(assessment.score, 33);

        let two_of_three = answers_with_override(&answers, "commute_distance", "8");
        assert_eq!(assess(CategoryId::Transportation, &two_of_three).score, 67);
    }

    fn answers_with_override(base: &AnswerSet, key: &str, value: &str) -> AnswerSet {
        let mut updated = base.clone();
        updated.insert(key.to_string(), DetailValue::from(value));
        updated
    }

    #[test]
    fn unknown_category_is_rejected() {
        let result = score("fashion", &AnswerSet::new());
        assert_eq!(
            result,
            Err(CoachingError::CategoryNotFound("fashion".to_string()))
        );
    }

    #[test]
    fn boolean_answers_drive_affirmative_questions() {
        let mut answers = AnswerSet::new();
        answers.insert("composting".to_string(), DetailValue::Flag(true));
        answers.insert("recycling_frequency".to_string(), DetailValue::from("Always"));
        answers.insert("single_use_plastics".to_string(), DetailValue::from("often"));

        assert_eq!(assess(CategoryId::WasteManagement, &answers).score, 67);
    }

    #[test]
    fn overall_score_is_rounded_mean_or_zero() {
        assert_eq!(overall_score(Vec::<u8>::new()), 0);
        assert_eq!(overall_score([100, 50]), 75);
        assert_eq!(overall_score([100, 33, 50]), 61);
        assert_eq!(overall_score([67, 50]), 59);
    }

    #[test]
    fn assessment_serializes_its_audit_trail() {
        let assessment = assess(
            CategoryId::WaterUsage,
            &answers(&[("shower_duration", "12"), ("low_flow_fixtures", "yes")]),
        );

        let payload = serde_json::to_value(&assessment).expect("assessment serializes");
        assert_eq!(payload["category"], serde_json::json!("water_usage"));
        assert_eq!(payload["score"], serde_json::json!(50));
        assert_eq!(
            payload["outcomes"][0],
            serde_json::json!({ "question": "shower_duration", "sustainable": false })
        );
    }

    #[test]
    fn question_lookup_finds_owning_category() {
        assert_eq!(
            category_for_question("shower_duration"),
            Some(CategoryId::WaterUsage)
        );
        assert_eq!(category_for_question("favourite_colour"), None);
    }
}
