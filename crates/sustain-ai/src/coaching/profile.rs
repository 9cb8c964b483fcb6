use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::domain::{
    AnswerSet, CategoryId, CategoryState, DetailedData, Profile, Recommendation, UserId,
};
use super::error::CoachingError;
use super::scoring::{self, category_for_question};

impl Profile {
    /// Build a profile from an initial survey. Answers are routed to the
    /// category that owns the question; categories without answers are left
    /// unassessed.
    pub fn create(user_id: UserId, initial_answers: AnswerSet, now: DateTime<Utc>) -> Self {
        let mut grouped: BTreeMap<CategoryId, AnswerSet> = BTreeMap::new();
        for (key, value) in initial_answers {
            match category_for_question(&key) {
                Some(category) => {
                    grouped.entry(category).or_default().insert(key, value);
                }
                None => tracing::debug!(question = %key, "ignoring answer outside the scored taxonomy"),
            }
        }

        let categories = grouped
            .into_iter()
            .map(|(category, answers)| {
                let detailed_data = DetailedData::from_answers(answers, now);
                let score = scoring::assess(category, &detailed_data).score;
                (
                    category,
                    CategoryState {
                        score,
                        assessed_at: now,
                        detailed_data,
                        recommendations: Vec::new(),
                    },
                )
            })
            .collect();

        let mut profile = Self {
            user_id,
            created_at: now,
            last_updated: now,
            overall_score: 0,
            categories,
            goals: Vec::new(),
        };
        profile.recompute_overall();
        profile
    }

    /// Merge new answers into a category (creating it when absent) and
    /// recompute the category and overall scores.
    pub fn update(
        &mut self,
        category: CategoryId,
        new_data: AnswerSet,
        now: DateTime<Utc>,
    ) -> &CategoryState {
        let state = self
            .categories
            .entry(category)
            .or_insert_with(|| CategoryState {
                score: scoring::NEUTRAL_SCORE,
                assessed_at: now,
                detailed_data: DetailedData::default(),
                recommendations: Vec::new(),
            });

        state.detailed_data.merge(new_data, now);
        state.score = scoring::assess(category, &state.detailed_data).score;
        state.assessed_at = now;

        self.touch(now);
        &self.categories[&category]
    }

    /// Name-based variant of [`Profile::update`] for untyped callers.
    pub fn update_named(
        &mut self,
        category: &str,
        new_data: AnswerSet,
        now: DateTime<Utc>,
    ) -> Result<&CategoryState, CoachingError> {
        let category: CategoryId = category.parse()?;
        Ok(self.update(category, new_data, now))
    }

    /// Replace a category score with an externally evaluated value.
    pub fn override_score(
        &mut self,
        category: CategoryId,
        score: u8,
        now: DateTime<Utc>,
    ) -> Result<(), CoachingError> {
        let state = self
            .categories
            .get_mut(&category)
            .ok_or_else(|| CoachingError::CategoryNotFound(category.key().to_string()))?;
        state.score = score.min(100);
        self.touch(now);
        Ok(())
    }

    pub fn set_recommendations(
        &mut self,
        category: CategoryId,
        recommendations: Vec<Recommendation>,
        now: DateTime<Utc>,
    ) -> Result<(), CoachingError> {
        let state = self
            .categories
            .get_mut(&category)
            .ok_or_else(|| CoachingError::CategoryNotFound(category.key().to_string()))?;
        state.recommendations = recommendations;
        self.last_updated = now;
        Ok(())
    }

    pub fn overall_score(&self) -> u8 {
        self.overall_score
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.recompute_overall();
        self.last_updated = now;
    }

    fn recompute_overall(&mut self) {
        self.overall_score =
            scoring::overall_score(self.categories.values().map(|state| state.score));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coaching::domain::DetailValue;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 22, 9, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    fn answers(pairs: &[(&str, &str)]) -> AnswerSet {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), DetailValue::from(*value)))
            .collect()
    }

    #[test]
    fn create_scores_each_answered_category() {
        let profile = Profile::create(
            UserId("user-1".to_string()),
            answers(&[
                ("transport_primary_mode", "cycling"),
                ("commute_distance", "5"),
                ("flights_per_year", "1"),
                ("favourite_colour", "green"),
            ]),
            at(0),
        );

        assert_eq!(profile.categories.len(), 1);
        let transportation = profile
            .category(CategoryId::Transportation)
            .expect("transportation assessed");
        assert_eq!(transportation.score, 100);
        assert_eq!(transportation.detailed_data.len(), 3);
        assert_eq!(profile.overall_score(), 100);
        assert_eq!(profile.created_at, at(0));
    }

    #[test]
    fn empty_profile_has_zero_overall_score() {
        let profile = Profile::create(UserId("user-2".to_string()), AnswerSet::new(), at(0));
        assert!(profile.categories.is_empty());
        assert_eq!(profile.overall_score(), 0);
    }

    #[test]
    fn update_merges_data_and_recomputes_scores() {
        let mut profile = Profile::create(
            UserId("user-3".to_string()),
            answers(&[
                ("transport_primary_mode", "car"),
                ("commute_distance", "30"),
            ]),
            at(0),
        );
        assert_eq!(profile.overall_score(), 0);

        let state = profile.update(
            CategoryId::Transportation,
            answers(&[("transport_primary_mode", "train")]),
            at(5),
        );
        assert_eq!(state.score, 50);
        assert_eq!(
            state.detailed_data.get("commute_distance"),
            Some(&DetailValue::from("30"))
        );
        assert_eq!(state.assessed_at, at(5));

        profile.update(
            CategoryId::WaterUsage,
            answers(&[("shower_duration", "4"), ("low_flow_fixtures", "yes")]),
            at(10),
        );

        assert_eq!(profile.overall_score(), 75);
        assert_eq!(profile.last_updated, at(10));
    }

    #[test]
    fn update_of_new_category_without_relevant_answers_is_neutral() {
        let mut profile = Profile::create(UserId("user-4".to_string()), AnswerSet::new(), at(0));
        let state = profile.update(
            CategoryId::EnergyUsage,
            answers(&[("owns_bike", "yes")]),
            at(1),
        );
        assert_eq!(state.score, 50);
        assert_eq!(profile.overall_score(), 50);
    }

    #[test]
    fn update_named_rejects_unknown_category() {
        let mut profile = Profile::create(UserId("user-5".to_string()), AnswerSet::new(), at(0));
        let result = profile.update_named("fashion", AnswerSet::new(), at(1));
        assert!(matches!(result, Err(CoachingError::CategoryNotFound(_))));
        assert_eq!(profile.last_updated, at(0));
    }

    #[test]
    fn override_score_keeps_overall_consistent() {
        let mut profile = Profile::create(
            UserId("user-6".to_string()),
            answers(&[("composting", "yes"), ("shower_duration", "12")]),
            at(0),
        );
        assert_eq!(profile.overall_score(), 50);

        profile
            .override_score(CategoryId::WaterUsage, 40, at(2))
            .expect("category present");
        assert_eq!(profile.overall_score(), 70);

        let missing = profile.override_score(CategoryId::FoodConsumption, 10, at(3));
        assert!(matches!(missing, Err(CoachingError::CategoryNotFound(_))));
    }
}
