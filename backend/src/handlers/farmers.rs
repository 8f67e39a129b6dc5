use axum::{extract::State, http::StatusCode, Json};

use super::AppJson;
use crate::error::AppError;
use crate::models::{Farmer, NewFarmer};
use crate::state::AppState;

/// `POST /farmer`: stores `{name, phone, location}` and echoes the record.
pub async fn create_farmer(
    State(state): State<AppState>,
    AppJson(new_farmer): AppJson<NewFarmer>,
) -> Result<(StatusCode, Json<Farmer>), AppError> {
    let farmer = state
        .store
        .insert_farmer(new_farmer.into_record())
        .await
        .map_err(|e| AppError::internal("Error creating farmer", e))?;
    log::info!("Created farmer record {}", farmer.id);
    Ok((StatusCode::CREATED, Json(farmer)))
}
