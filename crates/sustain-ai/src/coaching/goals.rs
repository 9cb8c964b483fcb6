use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{CategoryId, CheckIn, Goal, GoalId, GoalStatus, Profile};
use super::error::CoachingError;

static GOAL_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_goal_id(now: DateTime<Utc>) -> GoalId {
    let sequence = GOAL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    GoalId(format!("goal-{}-{sequence}", now.timestamp_millis()))
}

/// Status implied by a progress value; `0` leaves the current status untouched.
pub fn derive_status(current: GoalStatus, progress: u8) -> GoalStatus {
    match progress {
        100..=u8::MAX => GoalStatus::Completed,
        1..=99 => GoalStatus::InProgress,
        0 => current,
    }
}

/// Append-only goal bookkeeping over a single profile.
pub struct GoalTracker<'a> {
    profile: &'a mut Profile,
}

impl<'a> GoalTracker<'a> {
    pub fn new(profile: &'a mut Profile) -> Self {
        Self { profile }
    }

    pub fn add_goal(
        &mut self,
        category: CategoryId,
        description: impl Into<String>,
        target_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Goal {
        let goal = Goal {
            id: next_goal_id(now),
            category,
            description: description.into(),
            created_at: now,
            target_date,
            status: GoalStatus::Active,
            progress: 0,
            check_ins: Vec::new(),
        };

        self.profile.goals.push(goal.clone());
        self.profile.last_updated = now;
        goal
    }

    /// Record a check-in. Values above 100 are clamped. Unknown ids leave the
    /// profile untouched.
    pub fn record_progress(
        &mut self,
        goal_id: &GoalId,
        progress_value: u8,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Goal, CoachingError> {
        let goal = self
            .profile
            .goals
            .iter_mut()
            .find(|goal| &goal.id == goal_id)
            .ok_or_else(|| CoachingError::GoalNotFound(goal_id.clone()))?;

        let progress_value = progress_value.min(100);
        goal.check_ins.push(CheckIn {
            date: now,
            progress_value,
            notes,
        });
        goal.progress = progress_value;
        goal.status = derive_status(goal.status, progress_value);
        let updated = goal.clone();

        self.profile.last_updated = now;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coaching::domain::{AnswerSet, UserId};
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn profile() -> Profile {
        Profile::create(UserId("goal-owner".to_string()), AnswerSet::new(), at(1))
    }

    #[test]
    fn new_goals_start_active_with_zero_progress() {
        let mut profile = profile();
        let target = NaiveDate::from_ymd_opt(2025, 8, 1).expect("valid date");
        let goal = GoalTracker::new(&mut profile).add_goal(
            CategoryId::EnergyUsage,
            "Switch to a green tariff",
            Some(target),
            at(2),
        );

        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.progress, 0);
        assert_eq!(goal.target_date, Some(target));
        assert!(goal.id.0.starts_with("goal-"));
        assert_eq!(profile.goals.len(), 1);
        assert_eq!(profile.last_updated, at(2));
    }

    #[test]
    fn goal_ids_are_unique_within_the_same_instant() {
        let mut profile = profile();
        let mut tracker = GoalTracker::new(&mut profile);
        let first = tracker.add_goal(CategoryId::WaterUsage, "Shorter showers", None, at(2));
        let second = tracker.add_goal(CategoryId::WaterUsage, "Fix the tap", None, at(2));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn progress_drives_status() {
        let mut profile = profile();
        let mut tracker = GoalTracker::new(&mut profile);
        let goal = tracker.add_goal(CategoryId::Transportation, "Cycle to work", None, at(2));

        let zero = tracker
            .record_progress(&goal.id, 0, None, at(3))
            .expect("goal exists");
        assert_eq!(zero.status, GoalStatus::Active);

        for value in [1, 50, 99] {
            let updated = tracker
                .record_progress(&goal.id, value, None, at(4))
                .expect("goal exists");
            assert_eq!(updated.status, GoalStatus::InProgress);
        }

        let done = tracker
            .record_progress(&goal.id, 100, Some("Every day this week".to_string()), at(5))
            .expect("goal exists");
        assert_eq!(done.status, GoalStatus::Completed);
        assert_eq!(done.progress, 100);
        assert_eq!(done.check_ins.len(), 5);
        assert_eq!(
            done.check_ins.last().and_then(|check_in| check_in.notes.as_deref()),
            Some("Every day this week")
        );
    }

    #[test]
    fn lower_progress_after_completion_follows_mechanical_rule() {
        let mut profile = profile();
        let mut tracker = GoalTracker::new(&mut profile);
        let goal = tracker.add_goal(CategoryId::FoodConsumption, "Meat-free weekdays", None, at(2));
        tracker
            .record_progress(&goal.id, 100, None, at(3))
            .expect("goal exists");

        let regressed = tracker
            .record_progress(&goal.id, 60, None, at(4))
            .expect("goal exists");
        assert_eq!(regressed.status, GoalStatus::InProgress);

        let untouched = tracker
            .record_progress(&goal.id, 0, None, at(5))
            .expect("goal exists");
        assert_eq!(untouched.status, GoalStatus::InProgress);
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        let mut profile = profile();
        let mut tracker = GoalTracker::new(&mut profile);
        let goal = tracker.add_goal(CategoryId::WasteManagement, "Start composting", None, at(2));
        let updated = tracker
            .record_progress(&goal.id, 250, None, at(3))
            .expect("goal exists");
        assert_eq!(updated.progress, 100);
        assert_eq!(updated.status, GoalStatus::Completed);
    }

    #[test]
    fn unknown_goal_is_reported_without_mutation() {
        let mut profile = profile();
        let goal = GoalTracker::new(&mut profile).add_goal(
            CategoryId::WaterUsage,
            "Install low-flow shower head",
            None,
            at(2),
        );
        let before = profile.clone();

        let missing = GoalId("goal-missing".to_string());
        let result = GoalTracker::new(&mut profile).record_progress(&missing, 40, None, at(3));

        assert_eq!(result, Err(CoachingError::GoalNotFound(missing)));
        assert_eq!(profile, before);
        assert_eq!(profile.goals[0], goal);
    }
}
