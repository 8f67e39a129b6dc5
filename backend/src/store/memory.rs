use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{JobFilter, ListingFilter, MarketStore, OrderFilter, StoreError, StoreResult};
use crate::models::{
    Account, ActivityLog, BidStatus, Farmer, JobStatus, Listing, ListingChanges, ListingStatus,
    Order, OrderStatus, PlatformStats, ProfileChanges, SupportMessage, TransportBid, TransportJob,
    UserProfile, UserRole, UserSummary,
};

#[derive(Default)]
struct Tables {
    farmers: Vec<Farmer>,
    accounts: Vec<Account>,
    roles: Vec<UserRole>,
    profiles: Vec<UserProfile>,
    listings: Vec<Listing>,
    orders: Vec<Order>,
    jobs: Vec<TransportJob>,
    bids: Vec<TransportBid>,
    support: Vec<SupportMessage>,
    activity: Vec<ActivityLog>,
}

/// Process-local store. Rows are appended in insertion order, so "newest
/// first" is a reverse walk.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn email_taken(&self, email: &str) -> bool {
        self.accounts.iter().any(|a| a.email.eq_ignore_ascii_case(email))
    }
}

fn newest_first<T: Clone>(rows: &[T], keep: impl Fn(&T) -> bool) -> Vec<T> {
    rows.iter().rev().filter(|r| keep(r)).cloned().collect()
}

#[async_trait]
impl MarketStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn insert_farmer(&self, farmer: Farmer) -> StoreResult<Farmer> {
        self.tables.write().await.farmers.push(farmer.clone());
        Ok(farmer)
    }

    async fn insert_account(&self, account: Account) -> StoreResult<Account> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&account.email) {
            return Err(StoreError::Duplicate("account"));
        }
        tables.accounts.push(account.clone());
        Ok(account)
    }

    async fn create_user(
        &self,
        account: Account,
        role: UserRole,
        profile: UserProfile,
    ) -> StoreResult<Account> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&account.email) {
            return Err(StoreError::Duplicate("account"));
        }
        tables.accounts.push(account.clone());
        tables.roles.push(role);
        tables.profiles.push(profile);
        Ok(account)
    }

    async fn delete_user(&self, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.accounts.len();
        tables.accounts.retain(|a| a.id != user_id);
        if tables.accounts.len() == before {
            return Ok(false);
        }
        tables.roles.retain(|r| r.user_id != user_id);
        tables.profiles.retain(|p| p.user_id != user_id);
        Ok(true)
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_role(&self, user_id: Uuid) -> StoreResult<Option<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .roles
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.role.clone()))
    }

    async fn insert_role(&self, role: UserRole) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.roles.iter().any(|r| r.user_id == role.user_id) {
            return Err(StoreError::Duplicate("role"));
        }
        tables.roles.push(role);
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.profiles, |_| true)
            .into_iter()
            .map(|profile| {
                let role = tables
                    .roles
                    .iter()
                    .find(|r| r.user_id == profile.user_id)
                    .map(|r| r.role.clone());
                UserSummary { profile, role }
            })
            .collect())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> StoreResult<Option<UserProfile>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .map(|p| {
                changes.apply(p);
                p.updated_at = Utc::now();
                p.clone()
            }))
    }

    async fn set_profile_status(
        &self,
        user_id: Uuid,
        status: &str,
    ) -> StoreResult<Option<UserProfile>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .map(|p| {
                p.status = status.to_string();
                p.updated_at = Utc::now();
                p.clone()
            }))
    }

    async fn insert_listing(&self, listing: Listing) -> StoreResult<Listing> {
        self.tables.write().await.listings.push(listing.clone());
        Ok(listing)
    }

    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        let tables = self.tables.read().await;
        Ok(tables.listings.iter().find(|l| l.id == id).cloned())
    }

    async fn list_listings(&self, filter: ListingFilter) -> StoreResult<Vec<Listing>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.listings, |l| {
            filter.farmer_id.map_or(true, |id| l.farmer_id == id)
                && filter.status.map_or(true, |s| l.status == s.as_str())
        }))
    }

    async fn update_listing(
        &self,
        id: Uuid,
        changes: ListingChanges,
    ) -> StoreResult<Option<Listing>> {
        let mut tables = self.tables.write().await;
        Ok(tables.listings.iter_mut().find(|l| l.id == id).map(|l| {
            changes.apply(l);
            l.updated_at = Utc::now();
            l.clone()
        }))
    }

    async fn insert_order(&self, order: Order) -> StoreResult<Order> {
        self.tables.write().await.orders.push(order.clone());
        Ok(order)
    }

    async fn insert_orders(&self, orders: Vec<Order>) -> StoreResult<Vec<Order>> {
        self.tables.write().await.orders.extend(orders.iter().cloned());
        Ok(orders)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.orders, |o| {
            filter.buyer_id.map_or(true, |id| o.buyer_id == id)
                && filter.farmer_id.map_or(true, |id| o.farmer_id == id)
                && (filter.statuses.is_empty()
                    || filter.statuses.iter().any(|s| o.status == s.as_str()))
        }))
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>> {
        let mut tables = self.tables.write().await;
        Ok(tables.orders.iter_mut().find(|o| o.id == id).map(|o| {
            o.status = status.to_string();
            o.updated_at = Utc::now();
            o.clone()
        }))
    }

    async fn insert_job(&self, job: TransportJob) -> StoreResult<TransportJob> {
        self.tables.write().await.jobs.push(job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: Uuid) -> StoreResult<Option<TransportJob>> {
        let tables = self.tables.read().await;
        Ok(tables.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn list_jobs(&self, filter: JobFilter) -> StoreResult<Vec<TransportJob>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.jobs, |j| match filter {
            JobFilter::All => true,
            JobFilter::PostedBy(id) => j.farmer_id == id,
            JobFilter::VisibleTo(id) => {
                j.status == JobStatus::Open.as_str() || j.assigned_transporter_id == Some(id)
            }
        }))
    }

    async fn set_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
    ) -> StoreResult<Option<TransportJob>> {
        let mut tables = self.tables.write().await;
        Ok(tables.jobs.iter_mut().find(|j| j.id == id).map(|j| {
            j.status = status.to_string();
            j.updated_at = Utc::now();
            j.clone()
        }))
    }

    async fn insert_bid(&self, bid: TransportBid) -> StoreResult<TransportBid> {
        self.tables.write().await.bids.push(bid.clone());
        Ok(bid)
    }

    async fn list_bids(&self, job_id: Uuid) -> StoreResult<Vec<TransportBid>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.bids, |b| b.job_id == job_id))
    }

    async fn accept_bid(
        &self,
        job_id: Uuid,
        bid_id: Uuid,
    ) -> StoreResult<Option<(TransportJob, TransportBid)>> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let Some(bid) = tables
            .bids
            .iter()
            .find(|b| b.id == bid_id && b.job_id == job_id)
        else {
            return Ok(None);
        };
        if bid.status != BidStatus::Pending.as_str() {
            return Err(StoreError::Conflict("Bid is no longer pending"));
        }
        let transporter_id = bid.transporter_id;

        let Some(job) = tables.jobs.iter_mut().find(|j| j.id == job_id) else {
            return Ok(None);
        };
        if job.status != JobStatus::Open.as_str() {
            return Err(StoreError::Conflict("Job is no longer open"));
        }
        job.status = JobStatus::Assigned.to_string();
        job.assigned_transporter_id = Some(transporter_id);
        job.updated_at = now;
        let job = job.clone();

        let mut accepted = None;
        for bid in tables.bids.iter_mut().filter(|b| b.job_id == job_id) {
            if bid.id == bid_id {
                bid.status = BidStatus::Accepted.to_string();
                bid.updated_at = now;
                accepted = Some(bid.clone());
            } else if bid.status != BidStatus::Rejected.as_str() {
                bid.status = BidStatus::Rejected.to_string();
                bid.updated_at = now;
            }
        }
        Ok(accepted.map(|bid| (job, bid)))
    }

    async fn insert_support_message(&self, message: SupportMessage) -> StoreResult<SupportMessage> {
        self.tables.write().await.support.push(message.clone());
        Ok(message)
    }

    async fn list_support_messages(&self) -> StoreResult<Vec<SupportMessage>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.support, |_| true))
    }

    async fn insert_activity(&self, entry: ActivityLog) -> StoreResult<()> {
        self.tables.write().await.activity.push(entry);
        Ok(())
    }

    async fn list_activity(&self, limit: i64) -> StoreResult<Vec<ActivityLog>> {
        let tables = self.tables.read().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(tables.activity.iter().rev().take(limit).cloned().collect())
    }

    async fn platform_stats(&self) -> StoreResult<PlatformStats> {
        let tables = self.tables.read().await;
        let count_role = |role: &str| tables.roles.iter().filter(|r| r.role == role).count() as i64;

        let mut order_status_counts = BTreeMap::new();
        for order in &tables.orders {
            *order_status_counts.entry(order.status.clone()).or_insert(0) += 1;
        }

        Ok(PlatformStats {
            total_users: tables.accounts.len() as i64,
            total_farmers: count_role("farmer"),
            total_buyers: count_role("buyer"),
            total_transporters: count_role("transporter"),
            total_orders: tables.orders.len() as i64,
            total_revenue: tables
                .orders
                .iter()
                .filter(|o| o.status != OrderStatus::Cancelled.as_str())
                .map(|o| o.total_amount)
                .sum(),
            active_listings: tables
                .listings
                .iter()
                .filter(|l| l.status == ListingStatus::Approved.as_str())
                .count() as i64,
            order_status_counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewListing, NewTransportBid, NewTransportJob};
    use chrono::NaiveDate;

    fn job(owner: Uuid) -> TransportJob {
        NewTransportJob {
            title: "Maize to Nakuru".into(),
            description: None,
            pickup_location: "Eldoret".into(),
            delivery_location: "Nakuru".into(),
            pickup_date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            cargo_type: "grain".into(),
            weight_kg: Some(900.0),
            budget_amount: Some(12000.0),
        }
        .into_record(owner)
    }

    fn bid(amount: f64) -> NewTransportBid {
        NewTransportBid {
            bid_amount: amount,
            estimated_duration_hours: Some(6),
            message: None,
        }
    }

    #[tokio::test]
    async fn listings_come_back_newest_first() {
        let store = MemoryStore::new();
        let farmer = Uuid::new_v4();
        for title in ["first", "second"] {
            let listing = NewListing {
                title: title.into(),
                description: None,
                category: Some("vegetables".into()),
                price: 10.0,
                quantity: 1,
                unit: None,
                image_url: None,
            }
            .into_record(farmer);
            store.insert_listing(listing).await.unwrap();
        }
        let rows = store.list_listings(ListingFilter::default()).await.unwrap();
        let titles: Vec<_> = rows.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn accepting_a_bid_assigns_job_and_rejects_the_rest() {
        let store = MemoryStore::new();
        let job = store.insert_job(job(Uuid::new_v4())).await.unwrap();
        let winner = Uuid::new_v4();
        let w = store
            .insert_bid(bid(9000.0).into_record(job.id, winner))
            .await
            .unwrap();
        let l = store
            .insert_bid(bid(9500.0).into_record(job.id, Uuid::new_v4()))
            .await
            .unwrap();

        let (job, accepted) = store.accept_bid(job.id, w.id).await.unwrap().unwrap();
        assert_eq!(job.status, "assigned");
        assert_eq!(job.assigned_transporter_id, Some(winner));
        assert_eq!(accepted.status, "accepted");

        let bids = store.list_bids(job.id).await.unwrap();
        let loser = bids.iter().find(|b| b.id == l.id).unwrap();
        assert_eq!(loser.status, "rejected");
    }

    #[tokio::test]
    async fn a_job_only_takes_one_accepted_bid() {
        let store = MemoryStore::new();
        let job = store.insert_job(job(Uuid::new_v4())).await.unwrap();
        let first = store
            .insert_bid(bid(9000.0).into_record(job.id, Uuid::new_v4()))
            .await
            .unwrap();
        let second = store
            .insert_bid(bid(8800.0).into_record(job.id, Uuid::new_v4()))
            .await
            .unwrap();
        store.accept_bid(job.id, first.id).await.unwrap().unwrap();

        let err = store.accept_bid(job.id, second.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Reopening the job does not revive the rejected bid.
        store.set_job_status(job.id, JobStatus::Open).await.unwrap();
        let err = store.accept_bid(job.id, second.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("Bid is no longer pending")));

        // A fresh bid on the reopened job replaces the earlier winner.
        let third = store
            .insert_bid(bid(8500.0).into_record(job.id, Uuid::new_v4()))
            .await
            .unwrap();
        store.accept_bid(job.id, third.id).await.unwrap().unwrap();

        let accepted: Vec<_> = store
            .list_bids(job.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|b| b.status == "accepted")
            .map(|b| b.id)
            .collect();
        assert_eq!(accepted, vec![third.id]);
    }

    #[tokio::test]
    async fn pending_bid_on_assigned_job_conflicts() {
        let store = MemoryStore::new();
        let mut assigned = job(Uuid::new_v4());
        assigned.status = "assigned".into();
        let assigned = store.insert_job(assigned).await.unwrap();
        let late = store
            .insert_bid(bid(7000.0).into_record(assigned.id, Uuid::new_v4()))
            .await
            .unwrap();
        let err = store.accept_bid(assigned.id, late.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("Job is no longer open")));
    }

    #[tokio::test]
    async fn deleting_a_user_drops_role_and_profile() {
        let store = MemoryStore::new();
        let account = Account {
            id: Uuid::new_v4(),
            email: "kamau@example.com".into(),
            password_hash: "x".into(),
            full_name: Some("Kamau".into()),
            phone: None,
            location: None,
            signup_role: Some("farmer".into()),
            created_at: Utc::now(),
        };
        let profile = UserProfile::for_account(&account);
        store
            .create_user(account.clone(), UserRole::new(account.id, "farmer"), profile)
            .await
            .unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role.as_deref(), Some("farmer"));

        assert!(store.delete_user(account.id).await.unwrap());
        assert!(!store.delete_user(account.id).await.unwrap());
        assert!(store.get_profile(account.id).await.unwrap().is_none());
        assert!(store.find_role(account.id).await.unwrap().is_none());
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transporter_sees_open_and_own_jobs() {
        let store = MemoryStore::new();
        let me = Uuid::new_v4();
        let open = store.insert_job(job(Uuid::new_v4())).await.unwrap();
        let mut mine = job(Uuid::new_v4());
        mine.status = "assigned".into();
        mine.assigned_transporter_id = Some(me);
        let mine = store.insert_job(mine).await.unwrap();
        let mut other = job(Uuid::new_v4());
        other.status = "assigned".into();
        other.assigned_transporter_id = Some(Uuid::new_v4());
        store.insert_job(other).await.unwrap();

        let ids: Vec<_> = store
            .list_jobs(JobFilter::VisibleTo(me))
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec![mine.id, open.id]);
    }

    #[tokio::test]
    async fn duplicate_role_row_is_refused() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.insert_role(UserRole::new(user, "farmer")).await.unwrap();
        let err = store.insert_role(UserRole::new(user, "buyer")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("role")));
        assert_eq!(store.find_role(user).await.unwrap().as_deref(), Some("farmer"));
    }
}
