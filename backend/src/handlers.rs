use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::Deserialize;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::{ActivityLog, UnknownStatus};
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod cart;
pub mod farmers;
pub mod health;
pub mod listings;
pub mod orders;
pub mod profile;
pub mod support;
pub mod transport;

/// `Json` body extractor whose rejections render as `{"message"}` like every other error.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(AppJson(value))
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

impl StatusUpdate {
    pub fn parse<T>(&self) -> Result<T, AppError>
    where
        T: FromStr<Err = UnknownStatus>,
    {
        self.status
            .parse()
            .map_err(|e: UnknownStatus| AppError::BadRequest(e.to_string()))
    }
}

/// Activity logging never fails the request it describes.
pub(crate) async fn record_activity(state: &AppState, entry: ActivityLog) {
    let action = entry.action.clone();
    if let Err(e) = state.store.insert_activity(entry).await {
        log::warn!("Failed to write activity log for {}: {}", action, e);
    }
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::BadRequest(format!("{field} is required")))
    } else {
        Ok(())
    }
}
