//! Persistence seam for the marketplace.
//!
//! Handlers only talk to [`MarketStore`]. `PgStore` backs it with diesel on
//! PostgreSQL, `MemoryStore` keeps everything in process for local runs and
//! tests.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Account, ActivityLog, Farmer, JobStatus, Listing, ListingChanges, ListingStatus, Order,
    OrderStatus, PlatformStats, ProfileChanges, SupportMessage, TransportBid, TransportJob,
    UserProfile, UserRole, UserSummary,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{0} already exists")]
    Duplicate(&'static str),

    /// A guarded write found the row in the wrong state.
    #[error("{0}")]
    Conflict(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub farmer_id: Option<Uuid>,
    pub status: Option<ListingStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub buyer_id: Option<Uuid>,
    pub farmer_id: Option<Uuid>,
    /// Empty means any status.
    pub statuses: Vec<OrderStatus>,
}

#[derive(Debug, Clone, Default)]
pub enum JobFilter {
    #[default]
    All,
    /// Jobs posted by this farmer or buyer.
    PostedBy(Uuid),
    /// Open jobs plus jobs assigned to this transporter.
    VisibleTo(Uuid),
}

#[async_trait]
pub trait MarketStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn insert_farmer(&self, farmer: Farmer) -> StoreResult<Farmer>;

    async fn insert_account(&self, account: Account) -> StoreResult<Account>;
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>>;

    async fn find_role(&self, user_id: Uuid) -> StoreResult<Option<String>>;
    async fn insert_role(&self, role: UserRole) -> StoreResult<()>;

    /// Writes the account, its role row and its profile together.
    async fn create_user(
        &self,
        account: Account,
        role: UserRole,
        profile: UserProfile,
    ) -> StoreResult<Account>;
    /// Removes the account with its role and profile rows. `false` if absent.
    async fn delete_user(&self, user_id: Uuid) -> StoreResult<bool>;

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>>;
    /// Profiles with their role, newest first.
    async fn list_users(&self) -> StoreResult<Vec<UserSummary>>;
    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> StoreResult<Option<UserProfile>>;
    async fn set_profile_status(&self, user_id: Uuid, status: &str)
        -> StoreResult<Option<UserProfile>>;

    async fn insert_listing(&self, listing: Listing) -> StoreResult<Listing>;
    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<Listing>>;
    /// Newest first.
    async fn list_listings(&self, filter: ListingFilter) -> StoreResult<Vec<Listing>>;
    async fn update_listing(&self, id: Uuid, changes: ListingChanges)
        -> StoreResult<Option<Listing>>;

    async fn insert_order(&self, order: Order) -> StoreResult<Order>;
    /// All or nothing.
    async fn insert_orders(&self, orders: Vec<Order>) -> StoreResult<Vec<Order>>;
    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    /// Newest first.
    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>>;
    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>>;

    async fn insert_job(&self, job: TransportJob) -> StoreResult<TransportJob>;
    async fn get_job(&self, id: Uuid) -> StoreResult<Option<TransportJob>>;
    /// Newest first.
    async fn list_jobs(&self, filter: JobFilter) -> StoreResult<Vec<TransportJob>>;
    async fn set_job_status(&self, id: Uuid, status: JobStatus)
        -> StoreResult<Option<TransportJob>>;

    async fn insert_bid(&self, bid: TransportBid) -> StoreResult<TransportBid>;
    /// Newest first.
    async fn list_bids(&self, job_id: Uuid) -> StoreResult<Vec<TransportBid>>;
    /// Marks `bid_id` accepted, rejects every other live bid on the job and
    /// assigns the job to the winning transporter, atomically.
    ///
    /// `None` when the bid does not belong to the job. The bid must still be
    /// pending and the job still open, otherwise [`StoreError::Conflict`].
    async fn accept_bid(
        &self,
        job_id: Uuid,
        bid_id: Uuid,
    ) -> StoreResult<Option<(TransportJob, TransportBid)>>;

    async fn insert_support_message(&self, message: SupportMessage) -> StoreResult<SupportMessage>;
    /// Newest first.
    async fn list_support_messages(&self) -> StoreResult<Vec<SupportMessage>>;

    async fn insert_activity(&self, entry: ActivityLog) -> StoreResult<()>;
    /// Newest first, at most `limit` entries.
    async fn list_activity(&self, limit: i64) -> StoreResult<Vec<ActivityLog>>;

    async fn platform_stats(&self) -> StoreResult<PlatformStats>;
}
