use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::AppJson;
use crate::auth::AuthUser;
use crate::cart::{Cart, CartError, CartView};
use crate::error::AppError;
use crate::models::Order;
use crate::roles::Role;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub listing_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct QuantityUpdate {
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    pub delivery_address: Option<String>,
}

pub async fn get_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CartView>, AppError> {
    user.require(Role::Buyer)?;
    let cart = state.carts.get(user.id).await;
    Ok(Json(CartView::from(&cart)))
}

pub async fn add_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<AddToCart>,
) -> Result<Json<CartView>, AppError> {
    user.require(Role::Buyer)?;
    let listing = state
        .store
        .get_listing(req.listing_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

    let view = state
        .carts
        .update(user.id, |cart| {
            cart.add(&listing, req.quantity)
                .map(|_| CartView::from(&*cart))
        })
        .await?;
    log::debug!("{} added {} x {} to cart", user.email, req.quantity, listing.title);
    Ok(Json(view))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(listing_id): Path<Uuid>,
    AppJson(req): AppJson<QuantityUpdate>,
) -> Result<Json<CartView>, AppError> {
    user.require(Role::Buyer)?;
    let view = state
        .carts
        .update(user.id, |cart| {
            cart.update_quantity(listing_id, req.quantity)
                .map(|_| CartView::from(&*cart))
        })
        .await?;
    Ok(Json(view))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<CartView>, AppError> {
    user.require(Role::Buyer)?;
    let view = state
        .carts
        .update(user.id, |cart| {
            if cart.remove(listing_id) {
                Ok(CartView::from(&*cart))
            } else {
                Err(CartError::NotInCart)
            }
        })
        .await?;
    Ok(Json(view))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CartView>, AppError> {
    user.require(Role::Buyer)?;
    let view = state
        .carts
        .update(user.id, |cart| {
            cart.clear();
            CartView::from(&*cart)
        })
        .await;
    Ok(Json(view))
}

/// Turns every cart line into its own pending order, emptying the cart.
///
/// The lines are taken out of the cart up front. If a listing has since
/// disappeared or left the approved state, or the write fails, they go
/// back and nothing is written. The body is optional.
pub async fn checkout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Option<AppJson<CheckoutRequest>>,
) -> Result<(StatusCode, Json<Vec<Order>>), AppError> {
    user.require(Role::Buyer)?;
    let req = body.map(|AppJson(req)| req).unwrap_or_default();

    let cart = state.carts.take(user.id).await;
    if cart.is_empty() {
        return Err(CartError::Empty.into());
    }
    let total = cart.total();

    match place_orders(&state, &user, &cart, req.delivery_address).await {
        Ok(orders) => {
            log::info!(
                "{} checked out {} order(s) totalling KSh {:.2}",
                user.email,
                orders.len(),
                total
            );
            Ok((StatusCode::CREATED, Json(orders)))
        }
        Err(e) => {
            state.carts.restore(user.id, cart).await;
            Err(e)
        }
    }
}

async fn place_orders(
    state: &AppState,
    user: &AuthUser,
    cart: &Cart,
    delivery_address: Option<String>,
) -> Result<Vec<Order>, AppError> {
    for item in cart.items() {
        match state.store.get_listing(item.listing_id).await? {
            Some(l) if l.is_approved() => {}
            Some(_) => {
                return Err(AppError::Conflict(format!(
                    "{} is no longer available",
                    item.title
                )))
            }
            None => {
                return Err(AppError::NotFound(format!(
                    "{} is no longer listed",
                    item.title
                )))
            }
        }
    }

    let orders = cart
        .items()
        .iter()
        .map(|item| item.to_order(user.id, delivery_address.clone()))
        .collect();
    Ok(state.store.insert_orders(orders).await?)
}
