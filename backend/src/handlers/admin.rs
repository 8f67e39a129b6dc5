use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{record_activity, AppJson, StatusUpdate};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{ActivityLog, PlatformStats, ProfileStatus, UserProfile, UserSummary};
use crate::roles::Role;
use crate::state::AppState;

const DEFAULT_ACTIVITY_LIMIT: i64 = 50;
const MAX_ACTIVITY_LIMIT: i64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

fn activity_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT)
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    user.require(Role::Admin)?;
    Ok(Json(state.store.list_users().await?))
}

pub async fn set_user_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    AppJson(update): AppJson<StatusUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    user.require(Role::Admin)?;
    let status: ProfileStatus = update.parse()?;
    if user_id == user.id && status == ProfileStatus::Suspended {
        return Err(AppError::Conflict("You cannot suspend yourself".to_string()));
    }

    let profile = state
        .store
        .set_profile_status(user_id, status.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    record_activity(
        &state,
        ActivityLog::record(
            user.id,
            "user_status_changed",
            "user",
            user_id,
            json!({ "status": status }),
        ),
    )
    .await;
    log::info!("Admin {} set user {} to {}", user.email, user_id, status);
    Ok(Json(profile))
}

/// Removes the account with its role and profile. Listings, orders and
/// activity that reference the user are left as history.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require(Role::Admin)?;
    if user_id == user.id {
        return Err(AppError::Conflict("You cannot delete yourself".to_string()));
    }
    if !state.store.delete_user(user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    record_activity(
        &state,
        ActivityLog::record(user.id, "user_deleted", "user", user_id, json!({})),
    )
    .await;
    log::info!("Admin {} deleted user {}", user.email, user_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn platform_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PlatformStats>, AppError> {
    user.require(Role::Admin)?;
    Ok(Json(state.store.platform_stats().await?))
}

pub async fn list_activity(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, AppError> {
    user.require(Role::Admin)?;
    let limit = activity_limit(query.limit);
    Ok(Json(state.store.list_activity(limit).await?))
}
