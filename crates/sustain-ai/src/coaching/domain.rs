use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::CoachingError;

/// Identifier wrapper for coached users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed taxonomy of sustainability categories tracked per profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryId {
    Transportation,
    EnergyUsage,
    WaterUsage,
    WasteManagement,
    FoodConsumption,
}

impl CategoryId {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Transportation,
            Self::EnergyUsage,
            Self::WaterUsage,
            Self::WasteManagement,
            Self::FoodConsumption,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Transportation => "transportation",
            Self::EnergyUsage => "energy_usage",
            Self::WaterUsage => "water_usage",
            Self::WasteManagement => "waste_management",
            Self::FoodConsumption => "food_consumption",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Transportation => "Transportation",
            Self::EnergyUsage => "Energy Usage",
            Self::WaterUsage => "Water Usage",
            Self::WasteManagement => "Waste Management",
            Self::FoodConsumption => "Food Consumption",
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CategoryId {
    type Err = CoachingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ordered()
            .into_iter()
            .find(|category| category.key() == normalized)
            .ok_or_else(|| CoachingError::CategoryNotFound(value.to_string()))
    }
}

/// Single answer or observation captured for a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl DetailValue {
    /// Numeric view of the value; text answers such as `"5"` or `"5 km"` parse
    /// from their leading number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            DetailValue::Number(value) => Some(*value),
            DetailValue::Flag(_) => None,
            DetailValue::Text(text) => {
                let leading: String = text
                    .trim()
                    .chars()
                    .take_while(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == '-')
                    .collect();
                leading.parse().ok()
            }
        }
    }

    /// Lower-cased, whitespace-normalized text view used by the rule tables.
    pub fn as_keyword(&self) -> String {
        match self {
            DetailValue::Flag(true) => "yes".to_string(),
            DetailValue::Flag(false) => "no".to_string(),
            DetailValue::Number(value) => value.to_string(),
            DetailValue::Text(text) => text.trim().to_ascii_lowercase().replace([' ', '-'], "_"),
        }
    }

    pub fn is_affirmative(&self) -> bool {
        match self {
            DetailValue::Flag(flag) => *flag,
            DetailValue::Number(value) => *value > 0.0,
            DetailValue::Text(_) => matches!(self.as_keyword().as_str(), "yes" | "true" | "y"),
        }
    }
}

impl From<&str> for DetailValue {
    fn from(value: &str) -> Self {
        DetailValue::Text(value.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(value: String) -> Self {
        DetailValue::Text(value)
    }
}

impl From<f64> for DetailValue {
    fn from(value: f64) -> Self {
        DetailValue::Number(value)
    }
}

impl From<bool> for DetailValue {
    fn from(value: bool) -> Self {
        DetailValue::Flag(value)
    }
}

/// Raw answers keyed by question identifier.
pub type AnswerSet = BTreeMap<String, DetailValue>;

/// Versioned entry inside [`DetailedData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailEntry {
    pub value: DetailValue,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Key/value store of free-form answers with last-write-wins merging per key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedData {
    version: u64,
    entries: BTreeMap<String, DetailEntry>,
}

impl DetailedData {
    pub fn from_answers(answers: AnswerSet, at: DateTime<Utc>) -> Self {
        let mut data = Self::default();
        data.merge(answers, at);
        data
    }

    /// Merge new answers: keys present in `answers` override, all others persist.
    /// Each merge bumps the store version and stamps the touched keys with it.
    pub fn merge(&mut self, answers: AnswerSet, at: DateTime<Utc>) {
        if answers.is_empty() {
            return;
        }

        self.version += 1;
        for (key, value) in answers {
            self.entries.insert(
                key,
                DetailEntry {
                    value,
                    version: self.version,
                    updated_at: at,
                },
            );
        }
    }

    pub fn get(&self, key: &str) -> Option<&DetailValue> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn entry(&self, key: &str) -> Option<&DetailEntry> {
        self.entries.get(key)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DetailValue)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.as_str(), &entry.value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl FromStr for Impact {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown impact '{other}'")),
        }
    }
}

/// Experience level inferred from a category score when asking for generated advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn for_score(score: u8) -> Self {
        match score {
            0..=29 => Self::Beginner,
            30..=69 => Self::Intermediate,
            _ => Self::Advanced,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    KnowledgeBase,
    Generated,
    Placeholder,
}

/// Actionable suggestion attached to a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub impact: Impact,
    pub category: CategoryId,
    pub source: RecommendationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<SkillLevel>,
}

/// Assessment state of one category inside a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryState {
    pub score: u8,
    pub assessed_at: DateTime<Utc>,
    pub detailed_data: DetailedData,
    pub recommendations: Vec<Recommendation>,
}

/// Opaque goal identifier derived from the creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalId(pub String);

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    InProgress,
    Completed,
}

impl GoalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub date: DateTime<Utc>,
    pub progress_value: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Improvement goal tracked against a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub category: CategoryId,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    pub status: GoalStatus,
    pub progress: u8,
    pub check_ins: Vec<CheckIn>,
}

/// Structured sustainability profile owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub overall_score: u8,
    pub categories: BTreeMap<CategoryId, CategoryState>,
    pub goals: Vec<Goal>,
}

impl Profile {
    pub fn category(&self, category: CategoryId) -> Result<&CategoryState, CoachingError> {
        self.categories
            .get(&category)
            .ok_or_else(|| CoachingError::CategoryNotFound(category.key().to_string()))
    }

    pub fn active_goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals
            .iter()
            .filter(|goal| goal.status != GoalStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 22, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn category_parsing_accepts_keys_and_rejects_unknown_names() {
        assert_eq!(
            "energy_usage".parse::<CategoryId>().expect("known"),
            CategoryId::EnergyUsage
        );
        assert_eq!(
            "Water-Usage".parse::<CategoryId>().expect("normalized"),
            CategoryId::WaterUsage
        );

        match "fashion".parse::<CategoryId>() {
            Err(CoachingError::CategoryNotFound(name)) => assert_eq!(name, "fashion"),
            other => panic!("expected category not found, got {other:?}"),
        }
    }

    #[test]
    fn merge_overrides_new_keys_and_keeps_the_rest() {
        let mut initial = AnswerSet::new();
        initial.insert("composting".to_string(), DetailValue::from("no"));
        initial.insert("recycling_frequency".to_string(), DetailValue::from("often"));
        let mut data = DetailedData::from_answers(initial, at(8));

        let mut update = AnswerSet::new();
        update.insert("composting".to_string(), DetailValue::from(true));
        data.merge(update, at(9));

        assert_eq!(data.version(), 2);
        assert_eq!(data.get("composting"), Some(&DetailValue::Flag(true)));
        assert_eq!(
            data.get("recycling_frequency"),
            Some(&DetailValue::Text("often".to_string()))
        );

        let composting = data.entry("composting").expect("entry present");
        assert_eq!(composting.version, 2);
        assert_eq!(composting.updated_at, at(9));
        let recycling = data.entry("recycling_frequency").expect("entry present");
        assert_eq!(recycling.version, 1);
    }

    #[test]
    fn empty_merge_does_not_bump_version() {
        let mut data = DetailedData::default();
        data.merge(AnswerSet::new(), at(8));
        assert_eq!(data.version(), 0);
        assert!(data.is_empty());
    }

    #[test]
    fn detail_values_expose_numeric_and_keyword_views() {
        assert_eq!(DetailValue::from("5 km").as_number(), Some(5.0));
        assert_eq!(DetailValue::from("often").as_number(), None);
        assert_eq!(DetailValue::from(" Public Transit ").as_keyword(), "public_transit");
        assert!(DetailValue::from("Yes").is_affirmative());
        assert!(!DetailValue::Flag(false).is_affirmative());
    }

    #[test]
    fn skill_level_follows_score_bands() {
        assert_eq!(SkillLevel::for_score(0), SkillLevel::Beginner);
        assert_eq!(SkillLevel::for_score(29), SkillLevel::Beginner);
        assert_eq!(SkillLevel::for_score(30), SkillLevel::Intermediate);
        assert_eq!(SkillLevel::for_score(69), SkillLevel::Intermediate);
        assert_eq!(SkillLevel::for_score(70), SkillLevel::Advanced);
    }

    #[test]
    fn detail_values_deserialize_untagged() {
        let parsed: AnswerSet =
            serde_json::from_str(r#"{"a": true, "b": 3.5, "c": "cycling"}"#).expect("valid json");
        assert_eq!(parsed["a"], DetailValue::Flag(true));
        assert_eq!(parsed["b"], DetailValue::Number(3.5));
        assert_eq!(parsed["c"], DetailValue::Text("cycling".to_string()));
    }
}
