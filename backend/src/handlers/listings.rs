use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{record_activity, require_text, AppJson};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{ActivityLog, Listing, ListingChanges, ListingStatus, NewListing};
use crate::roles::Role;
use crate::state::AppState;
use crate::store::ListingFilter;

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub mine: bool,
}

#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub action: String,
}

fn validate_price(price: f64) -> Result<(), AppError> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(AppError::BadRequest("Price must be greater than zero".to_string()))
    }
}

fn validate_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 0 {
        Err(AppError::BadRequest("Quantity cannot be negative".to_string()))
    } else {
        Ok(())
    }
}

/// "all" and an absent filter both mean no status filter.
fn status_filter(raw: Option<&str>) -> Result<Option<ListingStatus>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|e: crate::models::UnknownStatus| AppError::BadRequest(e.to_string())),
    }
}

fn can_view(user: &AuthUser, listing: &Listing) -> bool {
    user.is_admin() || listing.farmer_id == user.id || listing.is_approved()
}

pub async fn list_listings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Vec<Listing>>, AppError> {
    let filter = match user.role {
        Role::Admin => ListingFilter {
            farmer_id: None,
            status: status_filter(query.status.as_deref())?,
        },
        Role::Farmer if query.mine => ListingFilter {
            farmer_id: Some(user.id),
            status: status_filter(query.status.as_deref())?,
        },
        _ => ListingFilter {
            farmer_id: None,
            status: Some(ListingStatus::Approved),
        },
    };

    let mut listings = state.store.list_listings(filter).await?;
    if let Some(term) = query.search.as_deref() {
        listings.retain(|l| l.matches_search(term));
    }
    Ok(Json(listings))
}

pub async fn create_listing(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(new_listing): AppJson<NewListing>,
) -> Result<(StatusCode, Json<Listing>), AppError> {
    user.require(Role::Farmer)?;
    require_text(&new_listing.title, "Title")?;
    require_text(new_listing.category.as_deref().unwrap_or(""), "Category")?;
    validate_price(new_listing.price)?;
    validate_quantity(new_listing.quantity)?;

    let listing = state
        .store
        .insert_listing(new_listing.into_record(user.id))
        .await?;
    log::info!("Farmer {} listed {} ({})", user.email, listing.title, listing.id);
    Ok((StatusCode::CREATED, Json(listing)))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Listing>, AppError> {
    state
        .store
        .get_listing(id)
        .await?
        .filter(|l| can_view(&user, l))
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))
}

pub async fn update_listing(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    AppJson(changes): AppJson<ListingChanges>,
) -> Result<Json<Listing>, AppError> {
    user.require(Role::Farmer)?;
    let listing = state
        .store
        .get_listing(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;
    if listing.farmer_id != user.id {
        return Err(AppError::Forbidden("You can only edit your own listings".to_string()));
    }

    if let Some(title) = &changes.title {
        require_text(title, "Title")?;
    }
    if let Some(price) = changes.price {
        validate_price(price)?;
    }
    if let Some(quantity) = changes.quantity {
        validate_quantity(quantity)?;
    }
    if let Some(status) = &changes.status {
        match status_filter(Some(status))? {
            Some(ListingStatus::Pending) | Some(ListingStatus::Inactive) => {}
            _ => {
                return Err(AppError::Forbidden(
                    "Farmers may only set a listing to pending or inactive".to_string(),
                ))
            }
        }
    }

    let updated = state
        .store
        .update_listing(id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;
    Ok(Json(updated))
}

pub async fn moderate_listing(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<ModerationRequest>,
) -> Result<Json<Listing>, AppError> {
    user.require(Role::Admin)?;
    let status = match req.action.trim() {
        "approve" => ListingStatus::Approved,
        "reject" => ListingStatus::Rejected,
        other => {
            return Err(AppError::BadRequest(format!(
                "Unknown moderation action: {other}"
            )))
        }
    };

    let listing = state
        .store
        .update_listing(id, ListingChanges::status_only(status))
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

    record_activity(
        &state,
        ActivityLog::record(
            user.id,
            &format!("listing_{}", status),
            "listing",
            listing.id,
            json!({ "title": listing.title }),
        ),
    )
    .await;
    log::info!("Admin {} set listing {} to {}", user.email, listing.id, status);
    Ok(Json(listing))
}
