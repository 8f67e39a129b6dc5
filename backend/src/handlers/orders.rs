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
use crate::models::{ActivityLog, Order, OrderStatus, UnknownStatus};
use crate::roles::Role;
use crate::state::AppState;
use crate::store::OrderFilter;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub listing_id: Uuid,
    pub quantity: i32,
    pub delivery_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<String>,
}

/// Who may move an order from `current` to `target`.
///
/// Admins set anything. Farmers confirm or cancel their own pending sales,
/// buyers cancel their own pending purchases, transporters advance the
/// delivery flow one step at a time.
pub fn authorize_order_transition(
    user: &AuthUser,
    order: &Order,
    current: OrderStatus,
    target: OrderStatus,
) -> Result<(), AppError> {
    let conflict = || {
        AppError::Conflict(format!(
            "Cannot move order from {current} to {target}"
        ))
    };
    match user.role {
        Role::Admin => Ok(()),
        Role::Farmer => {
            if order.farmer_id != user.id {
                return Err(AppError::Forbidden("Not your order".to_string()));
            }
            match (current, target) {
                (OrderStatus::Pending, OrderStatus::Confirmed)
                | (OrderStatus::Pending, OrderStatus::Cancelled) => Ok(()),
                _ => Err(conflict()),
            }
        }
        Role::Buyer => {
            if order.buyer_id != user.id {
                return Err(AppError::Forbidden("Not your order".to_string()));
            }
            match (current, target) {
                (OrderStatus::Pending, OrderStatus::Cancelled) => Ok(()),
                _ => Err(conflict()),
            }
        }
        Role::Transporter => {
            if current.next_delivery_step() == Some(target) {
                Ok(())
            } else {
                Err(conflict())
            }
        }
    }
}

pub async fn place_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    user.require(Role::Buyer)?;
    if req.quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".to_string()));
    }
    let listing = state
        .store
        .get_listing(req.listing_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;
    if !listing.is_approved() {
        return Err(AppError::Conflict(
            "Listing is not available for purchase".to_string(),
        ));
    }

    let order = state
        .store
        .insert_order(Order::place(user.id, &listing, req.quantity, req.delivery_address))
        .await?;
    log::info!(
        "Order {} placed by {} for {} x {} (KSh {:.2})",
        order.id,
        user.email,
        order.quantity,
        listing.title,
        order.total_amount
    );
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let statuses = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => Vec::new(),
        Some(s) => vec![s
            .parse::<OrderStatus>()
            .map_err(|e: UnknownStatus| AppError::BadRequest(e.to_string()))?],
    };
    let filter = match user.role {
        Role::Admin => OrderFilter {
            statuses,
            ..Default::default()
        },
        Role::Buyer => OrderFilter {
            buyer_id: Some(user.id),
            statuses,
            ..Default::default()
        },
        Role::Farmer => OrderFilter {
            farmer_id: Some(user.id),
            statuses,
            ..Default::default()
        },
        Role::Transporter => {
            return Err(AppError::Forbidden(
                "Transporters see orders through /deliveries".to_string(),
            ))
        }
    };
    Ok(Json(state.store.list_orders(filter).await?))
}

/// Orders awaiting or in delivery.
pub async fn list_deliveries(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Order>>, AppError> {
    user.require_any(&[Role::Transporter, Role::Admin])?;
    let filter = OrderFilter {
        statuses: OrderStatus::DELIVERY_QUEUE.to_vec(),
        ..Default::default()
    };
    Ok(Json(state.store.list_orders(filter).await?))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    AppJson(update): AppJson<StatusUpdate>,
) -> Result<Json<Order>, AppError> {
    let target: OrderStatus = update.parse()?;
    let order = state
        .store
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    let current: OrderStatus = order.status.parse().map_err(|e: UnknownStatus| {
        AppError::internal("Order has an unreadable status", e)
    })?;
    authorize_order_transition(&user, &order, current, target)?;

    let updated = state
        .store
        .set_order_status(id, target)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    record_activity(
        &state,
        ActivityLog::record(
            user.id,
            "order_status_changed",
            "order",
            updated.id,
            json!({ "from": current, "to": target }),
        ),
    )
    .await;
    log::info!("Order {} moved {} -> {} by {}", id, current, target, user.email);
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use OrderStatus::{Accepted, Cancelled, Completed, Confirmed, InTransit, Pending};

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: format!("{role}@example.com"),
            role,
        }
    }

    fn order(buyer: Uuid, farmer: Uuid) -> Order {
        Order {
            id: Uuid::new_v4(),
            buyer_id: buyer,
            farmer_id: farmer,
            listing_id: Uuid::new_v4(),
            quantity: 2,
            total_amount: 160.0,
            delivery_address: None,
            status: "pending".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn farmer_confirms_own_pending_order() {
        let farmer = user(Role::Farmer);
        let o = order(Uuid::new_v4(), farmer.id);
        assert!(authorize_order_transition(&farmer, &o, Pending, Confirmed).is_ok());
        assert!(matches!(
            authorize_order_transition(&farmer, &o, Pending, Completed),
            Err(AppError::Conflict(_))
        ));
        let stranger = user(Role::Farmer);
        assert!(matches!(
            authorize_order_transition(&stranger, &o, Pending, Confirmed),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn buyer_only_cancels_pending() {
        let buyer = user(Role::Buyer);
        let o = order(buyer.id, Uuid::new_v4());
        assert!(authorize_order_transition(&buyer, &o, Pending, Cancelled).is_ok());
        assert!(authorize_order_transition(&buyer, &o, Confirmed, Cancelled).is_err());
    }

    #[test]
    fn transporter_advances_one_step() {
        let t = user(Role::Transporter);
        let o = order(Uuid::new_v4(), Uuid::new_v4());
        assert!(authorize_order_transition(&t, &o, Pending, Accepted).is_ok());
        assert!(authorize_order_transition(&t, &o, Accepted, InTransit).is_ok());
        assert!(authorize_order_transition(&t, &o, Pending, Completed).is_err());
    }

    #[test]
    fn transporter_picks_up_confirmed_orders() {
        let t = user(Role::Transporter);
        let o = order(Uuid::new_v4(), Uuid::new_v4());
        assert!(authorize_order_transition(&t, &o, Confirmed, Accepted).is_ok());
        assert!(authorize_order_transition(&t, &o, Confirmed, InTransit).is_err());
    }

    #[test]
    fn admin_sets_anything() {
        let admin = user(Role::Admin);
        let o = order(Uuid::new_v4(), Uuid::new_v4());
        assert!(authorize_order_transition(&admin, &o, Completed, Pending).is_ok());
    }
}
