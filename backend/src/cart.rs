//! Per-buyer shopping carts, held in memory for the life of the process.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Listing, Order, OrderStatus};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CartError {
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Listing is not available for purchase")]
    NotAvailable,
    #[error("Item is not in the cart")]
    NotInCart,
    #[error("Cart is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub listing_id: Uuid,
    pub farmer_id: Uuid,
    pub title: String,
    pub unit: String,
    pub unit_price: f64,
    pub quantity: i32,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }

    /// One pending order for this line, priced at the cart's unit price.
    pub fn to_order(&self, buyer_id: Uuid, delivery_address: Option<String>) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            buyer_id,
            farmer_id: self.farmer_id,
            listing_id: self.listing_id,
            quantity: self.quantity,
            total_amount: self.line_total(),
            delivery_address,
            status: OrderStatus::Pending.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds `quantity` units; a listing already in the cart has its quantity raised.
    pub fn add(&mut self, listing: &Listing, quantity: i32) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        if !listing.is_approved() {
            return Err(CartError::NotAvailable);
        }
        match self.items.iter_mut().find(|i| i.listing_id == listing.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem {
                listing_id: listing.id,
                farmer_id: listing.farmer_id,
                title: listing.title.clone(),
                unit: listing.unit.clone(),
                unit_price: listing.price,
                quantity,
            }),
        }
        Ok(())
    }

    /// A quantity of zero or less drops the line.
    pub fn update_quantity(&mut self, listing_id: Uuid, quantity: i32) -> Result<(), CartError> {
        let pos = self
            .items
            .iter()
            .position(|i| i.listing_id == listing_id)
            .ok_or(CartError::NotInCart)?;
        if quantity <= 0 {
            self.items.remove(pos);
        } else {
            self.items[pos].quantity = quantity;
        }
        Ok(())
    }

    pub fn remove(&mut self, listing_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.listing_id != listing_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of `unit_price * quantity` over every line.
    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }

    /// Folds `other`'s lines back in, adding quantities for shared listings.
    pub fn merge(&mut self, other: Cart) {
        for line in other.items {
            match self.items.iter_mut().find(|i| i.listing_id == line.listing_id) {
                Some(item) => item.quantity = item.quantity.saturating_add(line.quantity),
                None => self.items.push(line),
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub item: CartItem,
    pub line_total: f64,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: i64,
    pub total: f64,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        CartView {
            items: cart
                .items()
                .iter()
                .map(|item| CartLineView {
                    line_total: item.line_total(),
                    item: item.clone(),
                })
                .collect(),
            item_count: cart.item_count(),
            total: cart.total(),
        }
    }
}

/// Carts keyed by buyer id.
#[derive(Default)]
pub struct CartBook {
    carts: RwLock<HashMap<Uuid, Cart>>,
}

impl CartBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: Uuid) -> Cart {
        self.carts
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Runs `f` against the user's cart, creating it if needed.
    pub async fn update<R>(&self, user_id: Uuid, f: impl FnOnce(&mut Cart) -> R) -> R {
        let mut carts = self.carts.write().await;
        f(carts.entry(user_id).or_default())
    }

    /// Empties the user's cart and hands back what it held.
    ///
    /// Two checkouts racing on one cart see the lines exactly once.
    pub async fn take(&self, user_id: Uuid) -> Cart {
        let mut carts = self.carts.write().await;
        carts.get_mut(&user_id).map(std::mem::take).unwrap_or_default()
    }

    /// Puts lines from a failed checkout back, keeping anything added since.
    pub async fn restore(&self, user_id: Uuid, lines: Cart) {
        let mut carts = self.carts.write().await;
        carts.entry(user_id).or_default().merge(lines);
    }
}
