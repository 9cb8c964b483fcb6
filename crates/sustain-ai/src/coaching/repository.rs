use super::domain::{Profile, UserId};

/// Storage abstraction keyed by user so the service can be exercised in isolation.
pub trait ProfileRepository: Send + Sync {
    fn insert(&self, profile: Profile) -> Result<Profile, RepositoryError>;
    fn update(&self, profile: Profile) -> Result<(), RepositoryError>;
    fn fetch(&self, user_id: &UserId) -> Result<Option<Profile>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("profile already exists")]
    Conflict,
    #[error("profile not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
