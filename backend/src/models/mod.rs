use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod status;

pub use status::{BidStatus, JobStatus, ListingStatus, OrderStatus, ProfileStatus, UnknownStatus};

/// Record behind the legacy `POST /farmer` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::farmers)]
pub struct Farmer {
    pub id: Uuid,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFarmer {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

impl NewFarmer {
    pub fn into_record(self) -> Farmer {
        Farmer {
            id: Uuid::new_v4(),
            name: self.name,
            phone: self.phone,
            location: self.location,
        }
    }
}

/// Login identity. `signup_role` is the role claimed at registration.
#[derive(Debug, Clone, Serialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub signup_role: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::user_roles)]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl UserRole {
    pub fn new(user_id: Uuid, role: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            role: role.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::user_profiles)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn for_account(account: &Account) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: account.id,
            email: Some(account.email.clone()),
            full_name: account.full_name.clone(),
            phone: account.phone.clone(),
            location: account.location.clone(),
            status: ProfileStatus::Active.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.status == ProfileStatus::Suspended.as_str()
    }
}

/// Admin view of a user: the profile plus the role row, if any.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, AsChangeset)]
#[diesel(table_name = crate::schema::user_profiles)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

impl ProfileChanges {
    pub fn apply(&self, profile: &mut UserProfile) {
        if let Some(full_name) = &self.full_name {
            profile.full_name = Some(full_name.clone());
        }
        if let Some(phone) = &self.phone {
            profile.phone = Some(phone.clone());
        }
        if let Some(location) = &self.location {
            profile.location = Some(location.clone());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::listings)]
pub struct Listing {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: f64,
    pub quantity: i32,
    pub unit: String,
    pub image_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_approved(&self) -> bool {
        self.status == ListingStatus::Approved.as_str()
    }

    /// Case-insensitive match on title or category.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&term)
            || self
                .category
                .as_deref()
                .map(|c| c.to_lowercase().contains(&term))
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: f64,
    pub quantity: i32,
    pub unit: Option<String>,
    pub image_url: Option<String>,
}

impl NewListing {
    pub fn into_record(self, farmer_id: Uuid) -> Listing {
        let now = Utc::now();
        Listing {
            id: Uuid::new_v4(),
            farmer_id,
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category,
            price: self.price,
            quantity: self.quantity,
            unit: self
                .unit
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| "kg".to_string()),
            image_url: self.image_url,
            status: ListingStatus::Pending.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, AsChangeset)]
#[diesel(table_name = crate::schema::listings)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<String>,
}

impl ListingChanges {
    pub fn status_only(status: ListingStatus) -> Self {
        Self {
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    pub fn apply(&self, listing: &mut Listing) {
        if let Some(title) = &self.title {
            listing.title = title.clone();
        }
        if let Some(description) = &self.description {
            listing.description = Some(description.clone());
        }
        if let Some(category) = &self.category {
            listing.category = Some(category.clone());
        }
        if let Some(price) = self.price {
            listing.price = price;
        }
        if let Some(quantity) = self.quantity {
            listing.quantity = quantity;
        }
        if let Some(unit) = &self.unit {
            listing.unit = unit.clone();
        }
        if let Some(image_url) = &self.image_url {
            listing.image_url = Some(image_url.clone());
        }
        if let Some(status) = &self.status {
            listing.status = status.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::orders)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub farmer_id: Uuid,
    pub listing_id: Uuid,
    pub quantity: i32,
    pub total_amount: f64,
    pub delivery_address: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Prices the order from the listing: `total_amount = price * quantity`.
    pub fn place(
        buyer_id: Uuid,
        listing: &Listing,
        quantity: i32,
        delivery_address: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            buyer_id,
            farmer_id: listing.farmer_id,
            listing_id: listing.id,
            quantity,
            total_amount: listing.price * f64::from(quantity),
            delivery_address,
            status: OrderStatus::Pending.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::transport_jobs)]
pub struct TransportJob {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub assigned_transporter_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub pickup_location: String,
    pub delivery_location: String,
    pub pickup_date: NaiveDate,
    pub cargo_type: String,
    pub weight_kg: f64,
    pub budget_amount: Option<f64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTransportJob {
    pub title: String,
    pub description: Option<String>,
    pub pickup_location: String,
    pub delivery_location: String,
    pub pickup_date: NaiveDate,
    #[serde(default)]
    pub cargo_type: String,
    pub weight_kg: Option<f64>,
    pub budget_amount: Option<f64>,
}

impl NewTransportJob {
    pub fn into_record(self, requester_id: Uuid) -> TransportJob {
        let now = Utc::now();
        TransportJob {
            id: Uuid::new_v4(),
            farmer_id: requester_id,
            assigned_transporter_id: None,
            title: self.title.trim().to_string(),
            description: self.description,
            pickup_location: self.pickup_location.trim().to_string(),
            delivery_location: self.delivery_location.trim().to_string(),
            pickup_date: self.pickup_date,
            cargo_type: self.cargo_type,
            weight_kg: self.weight_kg.unwrap_or(0.0),
            budget_amount: Some(self.budget_amount.unwrap_or(0.0)),
            status: JobStatus::Open.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::transport_bids)]
pub struct TransportBid {
    pub id: Uuid,
    pub job_id: Uuid,
    pub transporter_id: Uuid,
    pub bid_amount: f64,
    pub estimated_duration_hours: Option<i32>,
    pub message: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTransportBid {
    pub bid_amount: f64,
    pub estimated_duration_hours: Option<i32>,
    pub message: Option<String>,
}

impl NewTransportBid {
    pub fn into_record(self, job_id: Uuid, transporter_id: Uuid) -> TransportBid {
        let now = Utc::now();
        TransportBid {
            id: Uuid::new_v4(),
            job_id,
            transporter_id,
            bid_amount: self.bid_amount,
            estimated_duration_hours: self.estimated_duration_hours,
            message: self.message,
            status: BidStatus::Pending.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::support_messages)]
pub struct SupportMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub message: String,
    pub priority: String,
    pub status: String,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSupportMessage {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    pub priority: Option<String>,
}

impl NewSupportMessage {
    pub fn into_record(self, user_id: Uuid) -> SupportMessage {
        let now = Utc::now();
        SupportMessage {
            id: Uuid::new_v4(),
            user_id,
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
            priority: self.priority.unwrap_or_else(|| "normal".to_string()),
            status: "open".to_string(),
            assigned_to: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::activity_logs)]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    pub fn record(
        actor: Uuid,
        action: &str,
        entity_type: &str,
        entity_id: impl ToString,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: Some(actor),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: Some(entity_id.to_string()),
            details: Some(details),
            created_at: Utc::now(),
        }
    }
}

/// Aggregate dashboard numbers, computed on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_farmers: i64,
    pub total_buyers: i64,
    pub total_transporters: i64,
    pub total_orders: i64,
    pub total_revenue: f64,
    pub active_listings: i64,
    pub order_status_counts: std::collections::BTreeMap<String, i64>,
}
