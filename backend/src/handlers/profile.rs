use axum::{extract::State, Extension, Json};

use super::AppJson;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{ProfileChanges, UserProfile};
use crate::state::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>, AppError> {
    state
        .store
        .get_profile(user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(changes): AppJson<ProfileChanges>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state
        .store
        .update_profile(user.id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    log::info!("{} updated their profile", user.email);
    Ok(Json(profile))
}
