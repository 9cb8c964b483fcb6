use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::chat::ChatReply;
use super::domain::{AnswerSet, Goal, GoalId, Profile, UserId};
use super::recommendations::RecommendationSet;
use super::repository::ProfileRepository;
use super::service::{CategoryUpdate, ProfileSnapshot, SustainabilityCoachService};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfileRequest {
    pub user_id: String,
    #[serde(default)]
    pub answers: AnswerSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    pub answers: AnswerSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddGoalRequest {
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRequest {
    /// Values above 100 are clamped.
    pub progress_value: u16,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Router exposing profile, recommendation, goal and coaching endpoints.
pub fn coaching_router<R>(service: Arc<SustainabilityCoachService<R>>) -> Router
where
    R: ProfileRepository + 'static,
{
    Router::new()
        .route("/api/v1/profiles", post(create_profile_handler::<R>))
        .route("/api/v1/profiles/:user_id", get(get_profile_handler::<R>))
        .route(
            "/api/v1/profiles/:user_id/categories/:category",
            put(update_category_handler::<R>),
        )
        .route(
            "/api/v1/profiles/:user_id/recommendations/:category",
            get(recommendations_handler::<R>),
        )
        .route("/api/v1/profiles/:user_id/goals", post(add_goal_handler::<R>))
        .route(
            "/api/v1/profiles/:user_id/goals/:goal_id/progress",
            post(progress_handler::<R>),
        )
        .route(
            "/api/v1/profiles/:user_id/summary",
            get(summary_handler::<R>),
        )
        .route("/api/v1/profiles/:user_id/chat", post(chat_handler::<R>))
        .with_state(service)
}

pub(crate) async fn create_profile_handler<R>(
    State(service): State<Arc<SustainabilityCoachService<R>>>,
    Json(request): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<ProfileSnapshot>), AppError>
where
    R: ProfileRepository + 'static,
{
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(invalid_request("user_id must not be empty"));
    }

    let snapshot = service
        .create_profile(UserId(user_id.to_string()), request.answers)
        .await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub(crate) async fn get_profile_handler<R>(
    State(service): State<Arc<SustainabilityCoachService<R>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Profile>, AppError>
where
    R: ProfileRepository + 'static,
{
    Ok(Json(service.get_profile(&UserId(user_id)).await?))
}

pub(crate) async fn update_category_handler<R>(
    State(service): State<Arc<SustainabilityCoachService<R>>>,
    Path((user_id, category)): Path<(String, String)>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<CategoryUpdate>, AppError>
where
    R: ProfileRepository + 'static,
{
    let update = service
        .update_category(&UserId(user_id), &category, request.answers)
        .await?;
    Ok(Json(update))
}

pub(crate) async fn recommendations_handler<R>(
    State(service): State<Arc<SustainabilityCoachService<R>>>,
    Path((user_id, category)): Path<(String, String)>,
) -> Result<Json<RecommendationSet>, AppError>
where
    R: ProfileRepository + 'static,
{
    Ok(Json(
        service.recommendations(&UserId(user_id), &category).await?,
    ))
}

pub(crate) async fn add_goal_handler<R>(
    State(service): State<Arc<SustainabilityCoachService<R>>>,
    Path(user_id): Path<String>,
    Json(request): Json<AddGoalRequest>,
) -> Result<(StatusCode, Json<Goal>), AppError>
where
    R: ProfileRepository + 'static,
{
    let description = request.description.trim();
    if description.is_empty() {
        return Err(invalid_request("description must not be empty"));
    }

    let goal = service
        .add_goal(
            &UserId(user_id),
            &request.category,
            description.to_string(),
            request.target_date,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

pub(crate) async fn progress_handler<R>(
    State(service): State<Arc<SustainabilityCoachService<R>>>,
    Path((user_id, goal_id)): Path<(String, String)>,
    Json(request): Json<ProgressRequest>,
) -> Result<Json<Goal>, AppError>
where
    R: ProfileRepository + 'static,
{
    let progress_value = request.progress_value.min(100) as u8;
    let goal = service
        .record_progress(
            &UserId(user_id),
            &GoalId(goal_id),
            progress_value,
            request.notes,
        )
        .await?;
    Ok(Json(goal))
}

pub(crate) async fn summary_handler<R>(
    State(service): State<Arc<SustainabilityCoachService<R>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    R: ProfileRepository + 'static,
{
    let user_id = UserId(user_id);
    let summary = service.summarize(&user_id).await?;
    Ok(Json(json!({
        "user_id": user_id,
        "summary": summary,
    })))
}

pub(crate) async fn chat_handler<R>(
    State(service): State<Arc<SustainabilityCoachService<R>>>,
    Path(user_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError>
where
    R: ProfileRepository + 'static,
{
    if request.message.trim().is_empty() {
        return Err(invalid_request("message must not be empty"));
    }

    Ok(Json(service.chat(&UserId(user_id), &request.message).await?))
}

fn invalid_request(message: &str) -> AppError {
    AppError::InvalidRequest(message.to_string())
}
