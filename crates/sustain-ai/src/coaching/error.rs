use super::domain::{GoalId, UserId};

/// Domain failures raised by the coaching engine.
///
/// `CategoryNotFound`, `GoalNotFound` and the profile lookups are returned to
/// callers. `UpstreamService` and `UnparsableGenerativeOutput` are produced by
/// provider adapters and validators and are recovered inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoachingError {
    #[error("category '{0}' not found")]
    CategoryNotFound(String),
    #[error("goal '{0}' not found")]
    GoalNotFound(GoalId),
    #[error("profile for user '{0}' not found")]
    ProfileNotFound(UserId),
    #[error("profile for user '{0}' already exists")]
    ProfileExists(UserId),
    #[error("upstream service '{provider}' failed: {reason}")]
    UpstreamService { provider: String, reason: String },
    #[error("generative output could not be parsed: {0}")]
    UnparsableGenerativeOutput(String),
}

impl CoachingError {
    /// Stable machine-readable identifier used in API payloads.
    pub const fn kind(&self) -> &'static str {
        match self {
            CoachingError::CategoryNotFound(_) => "category_not_found",
            CoachingError::GoalNotFound(_) => "goal_not_found",
            CoachingError::ProfileNotFound(_) => "profile_not_found",
            CoachingError::ProfileExists(_) => "profile_exists",
            CoachingError::UpstreamService { .. } => "upstream_service_error",
            CoachingError::UnparsableGenerativeOutput(_) => "unparsable_generative_output",
        }
    }
}
