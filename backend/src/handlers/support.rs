use axum::{extract::State, http::StatusCode, Extension, Json};

use super::{require_text, AppJson};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{NewSupportMessage, SupportMessage};
use crate::roles::Role;
use crate::state::AppState;

const PRIORITIES: [&str; 4] = ["low", "normal", "high", "urgent"];

pub async fn create_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(mut new_message): AppJson<NewSupportMessage>,
) -> Result<(StatusCode, Json<SupportMessage>), AppError> {
    require_text(&new_message.subject, "Subject")?;
    require_text(&new_message.message, "Message")?;
    if let Some(priority) = new_message.priority.take() {
        let priority = priority.trim().to_lowercase();
        if !PRIORITIES.contains(&priority.as_str()) {
            return Err(AppError::BadRequest(format!("Unknown priority: {priority}")));
        }
        new_message.priority = Some(priority);
    }

    let message = state
        .store
        .insert_support_message(new_message.into_record(user.id))
        .await?;
    log::info!("Support message {} from {}", message.id, user.email);
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<SupportMessage>>, AppError> {
    user.require(Role::Admin)?;
    Ok(Json(state.store.list_support_messages().await?))
}
