use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use super::{JobFilter, ListingFilter, MarketStore, OrderFilter, StoreError, StoreResult};
use crate::db::{PgPool, PgPooledConnection};
use crate::models::{
    Account, ActivityLog, BidStatus, Farmer, JobStatus, Listing, ListingChanges, ListingStatus,
    Order, OrderStatus, PlatformStats, ProfileChanges, SupportMessage, TransportBid, TransportJob,
    UserProfile, UserRole, UserSummary,
};
use crate::schema::{
    activity_logs, farmers, listings, orders, support_messages, transport_bids, transport_jobs,
    user_profiles, user_roles, users,
};

/// diesel-backed store. Every query runs on the blocking pool with its own
/// pooled connection.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn: PgPooledConnection = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}

fn unique_as_duplicate(what: &'static str) -> impl FnOnce(DieselError) -> StoreError {
    move |err| match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreError::Duplicate(what)
        }
        other => StoreError::Database(other),
    }
}

fn count_role(conn: &mut PgConnection, role: &str) -> QueryResult<i64> {
    user_roles::table
        .filter(user_roles::role.eq(role))
        .count()
        .get_result(conn)
}

#[async_trait]
impl MarketStore for PgStore {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn insert_farmer(&self, farmer: Farmer) -> StoreResult<Farmer> {
        self.run(move |conn| {
            Ok(diesel::insert_into(farmers::table)
                .values(&farmer)
                .get_result::<Farmer>(conn)?)
        })
        .await
    }

    async fn insert_account(&self, account: Account) -> StoreResult<Account> {
        self.run(move |conn| {
            diesel::insert_into(users::table)
                .values(&account)
                .get_result::<Account>(conn)
                .map_err(unique_as_duplicate("account"))
        })
        .await
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let email = email.trim().to_lowercase();
        self.run(move |conn| {
            Ok(users::table
                .filter(users::email.eq(email))
                .first::<Account>(conn)
                .optional()?)
        })
        .await
    }

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        self.run(move |conn| Ok(users::table.find(id).first::<Account>(conn).optional()?))
            .await
    }

    async fn find_role(&self, user_id: Uuid) -> StoreResult<Option<String>> {
        self.run(move |conn| {
            Ok(user_roles::table
                .filter(user_roles::user_id.eq(user_id))
                .select(user_roles::role)
                .first::<String>(conn)
                .optional()?)
        })
        .await
    }

    async fn insert_role(&self, role: UserRole) -> StoreResult<()> {
        self.run(move |conn| {
            diesel::insert_into(user_roles::table)
                .values(&role)
                .execute(conn)
                .map(|_| ())
                .map_err(unique_as_duplicate("role"))
        })
        .await
    }

    async fn create_user(
        &self,
        account: Account,
        role: UserRole,
        profile: UserProfile,
    ) -> StoreResult<Account> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let account = diesel::insert_into(users::table)
                    .values(&account)
                    .get_result::<Account>(conn)
                    .map_err(unique_as_duplicate("account"))?;
                diesel::insert_into(user_roles::table)
                    .values(&role)
                    .execute(conn)
                    .map_err(unique_as_duplicate("role"))?;
                diesel::insert_into(user_profiles::table)
                    .values(&profile)
                    .execute(conn)
                    .map_err(unique_as_duplicate("profile"))?;
                Ok(account)
            })
        })
        .await
    }

    async fn delete_user(&self, user_id: Uuid) -> StoreResult<bool> {
        self.run(move |conn| {
            Ok(conn.transaction::<_, DieselError, _>(|conn| {
                diesel::delete(user_roles::table.filter(user_roles::user_id.eq(user_id)))
                    .execute(conn)?;
                diesel::delete(user_profiles::table.filter(user_profiles::user_id.eq(user_id)))
                    .execute(conn)?;
                let removed = diesel::delete(users::table.find(user_id)).execute(conn)?;
                Ok(removed > 0)
            })?)
        })
        .await
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        self.run(move |conn| {
            Ok(user_profiles::table
                .filter(user_profiles::user_id.eq(user_id))
                .first::<UserProfile>(conn)
                .optional()?)
        })
        .await
    }

    async fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        self.run(|conn| {
            let rows = user_profiles::table
                .left_join(user_roles::table.on(user_roles::user_id.eq(user_profiles::user_id)))
                .select((user_profiles::all_columns, user_roles::role.nullable()))
                .order(user_profiles::created_at.desc())
                .load::<(UserProfile, Option<String>)>(conn)?;
            Ok(rows
                .into_iter()
                .map(|(profile, role)| UserSummary { profile, role })
                .collect())
        })
        .await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> StoreResult<Option<UserProfile>> {
        self.run(move |conn| {
            Ok(diesel::update(user_profiles::table.filter(user_profiles::user_id.eq(user_id)))
                .set((&changes, user_profiles::updated_at.eq(Utc::now())))
                .get_result::<UserProfile>(conn)
                .optional()?)
        })
        .await
    }

    async fn set_profile_status(
        &self,
        user_id: Uuid,
        status: &str,
    ) -> StoreResult<Option<UserProfile>> {
        let status = status.to_string();
        self.run(move |conn| {
            Ok(diesel::update(user_profiles::table.filter(user_profiles::user_id.eq(user_id)))
                .set((
                    user_profiles::status.eq(status),
                    user_profiles::updated_at.eq(Utc::now()),
                ))
                .get_result::<UserProfile>(conn)
                .optional()?)
        })
        .await
    }

    async fn insert_listing(&self, listing: Listing) -> StoreResult<Listing> {
        self.run(move |conn| {
            Ok(diesel::insert_into(listings::table)
                .values(&listing)
                .get_result::<Listing>(conn)?)
        })
        .await
    }

    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        self.run(move |conn| Ok(listings::table.find(id).first::<Listing>(conn).optional()?))
            .await
    }

    async fn list_listings(&self, filter: ListingFilter) -> StoreResult<Vec<Listing>> {
        self.run(move |conn| {
            let mut query = listings::table.into_boxed();
            if let Some(farmer_id) = filter.farmer_id {
                query = query.filter(listings::farmer_id.eq(farmer_id));
            }
            if let Some(status) = filter.status {
                query = query.filter(listings::status.eq(status.as_str()));
            }
            Ok(query
                .order(listings::created_at.desc())
                .load::<Listing>(conn)?)
        })
        .await
    }

    async fn update_listing(
        &self,
        id: Uuid,
        changes: ListingChanges,
    ) -> StoreResult<Option<Listing>> {
        self.run(move |conn| {
            Ok(diesel::update(listings::table.find(id))
                .set((&changes, listings::updated_at.eq(Utc::now())))
                .get_result::<Listing>(conn)
                .optional()?)
        })
        .await
    }

    async fn insert_order(&self, order: Order) -> StoreResult<Order> {
        self.run(move |conn| {
            Ok(diesel::insert_into(orders::table)
                .values(&order)
                .get_result::<Order>(conn)?)
        })
        .await
    }

    async fn insert_orders(&self, orders: Vec<Order>) -> StoreResult<Vec<Order>> {
        self.run(move |conn| {
            Ok(conn.transaction::<_, DieselError, _>(|conn| {
                diesel::insert_into(orders::table)
                    .values(&orders)
                    .get_results::<Order>(conn)
            })?)
        })
        .await
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        self.run(move |conn| Ok(orders::table.find(id).first::<Order>(conn).optional()?))
            .await
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>> {
        self.run(move |conn| {
            let mut query = orders::table.into_boxed();
            if let Some(buyer_id) = filter.buyer_id {
                query = query.filter(orders::buyer_id.eq(buyer_id));
            }
            if let Some(farmer_id) = filter.farmer_id {
                query = query.filter(orders::farmer_id.eq(farmer_id));
            }
            if !filter.statuses.is_empty() {
                let statuses: Vec<&'static str> =
                    filter.statuses.iter().map(|s| s.as_str()).collect();
                query = query.filter(orders::status.eq_any(statuses));
            }
            Ok(query.order(orders::created_at.desc()).load::<Order>(conn)?)
        })
        .await
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>> {
        self.run(move |conn| {
            Ok(diesel::update(orders::table.find(id))
                .set((
                    orders::status.eq(status.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .get_result::<Order>(conn)
                .optional()?)
        })
        .await
    }

    async fn insert_job(&self, job: TransportJob) -> StoreResult<TransportJob> {
        self.run(move |conn| {
            Ok(diesel::insert_into(transport_jobs::table)
                .values(&job)
                .get_result::<TransportJob>(conn)?)
        })
        .await
    }

    async fn get_job(&self, id: Uuid) -> StoreResult<Option<TransportJob>> {
        self.run(move |conn| {
            Ok(transport_jobs::table
                .find(id)
                .first::<TransportJob>(conn)
                .optional()?)
        })
        .await
    }

    async fn list_jobs(&self, filter: JobFilter) -> StoreResult<Vec<TransportJob>> {
        self.run(move |conn| {
            let mut query = transport_jobs::table.into_boxed();
            match filter {
                JobFilter::All => {}
                JobFilter::PostedBy(owner) => {
                    query = query.filter(transport_jobs::farmer_id.eq(owner));
                }
                JobFilter::VisibleTo(transporter) => {
                    query = query.filter(
                        transport_jobs::status.eq(JobStatus::Open.as_str()).or(
                            transport_jobs::assigned_transporter_id
                                .is_not_distinct_from(transporter),
                        ),
                    );
                }
            }
            Ok(query
                .order(transport_jobs::created_at.desc())
                .load::<TransportJob>(conn)?)
        })
        .await
    }

    async fn set_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
    ) -> StoreResult<Option<TransportJob>> {
        self.run(move |conn| {
            Ok(diesel::update(transport_jobs::table.find(id))
                .set((
                    transport_jobs::status.eq(status.as_str()),
                    transport_jobs::updated_at.eq(Utc::now()),
                ))
                .get_result::<TransportJob>(conn)
                .optional()?)
        })
        .await
    }

    async fn insert_bid(&self, bid: TransportBid) -> StoreResult<TransportBid> {
        self.run(move |conn| {
            Ok(diesel::insert_into(transport_bids::table)
                .values(&bid)
                .get_result::<TransportBid>(conn)?)
        })
        .await
    }

    async fn list_bids(&self, job_id: Uuid) -> StoreResult<Vec<TransportBid>> {
        self.run(move |conn| {
            Ok(transport_bids::table
                .filter(transport_bids::job_id.eq(job_id))
                .order(transport_bids::created_at.desc())
                .load::<TransportBid>(conn)?)
        })
        .await
    }

    async fn accept_bid(
        &self,
        job_id: Uuid,
        bid_id: Uuid,
    ) -> StoreResult<Option<(TransportJob, TransportBid)>> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let Some(bid) = transport_bids::table
                    .filter(transport_bids::id.eq(bid_id))
                    .filter(transport_bids::job_id.eq(job_id))
                    .first::<TransportBid>(conn)
                    .optional()?
                else {
                    return Ok(None);
                };
                if bid.status != BidStatus::Pending.as_str() {
                    return Err(StoreError::Conflict("Bid is no longer pending"));
                }
                let now = Utc::now();

                // Only an open job can be claimed; a concurrent accept loses here.
                let job = diesel::update(
                    transport_jobs::table
                        .find(job_id)
                        .filter(transport_jobs::status.eq(JobStatus::Open.as_str())),
                )
                .set((
                    transport_jobs::status.eq(JobStatus::Assigned.as_str()),
                    transport_jobs::assigned_transporter_id.eq(Some(bid.transporter_id)),
                    transport_jobs::updated_at.eq(now),
                ))
                .get_result::<TransportJob>(conn)
                .optional()?
                .ok_or(StoreError::Conflict("Job is no longer open"))?;

                // A job reopened by an admin may still carry its earlier winner.
                diesel::update(
                    transport_bids::table
                        .filter(transport_bids::job_id.eq(job_id))
                        .filter(transport_bids::id.ne(bid_id))
                        .filter(transport_bids::status.eq_any([
                            BidStatus::Pending.as_str(),
                            BidStatus::Accepted.as_str(),
                        ])),
                )
                .set((
                    transport_bids::status.eq(BidStatus::Rejected.as_str()),
                    transport_bids::updated_at.eq(now),
                ))
                .execute(conn)?;

                let bid = diesel::update(
                    transport_bids::table
                        .find(bid.id)
                        .filter(transport_bids::status.eq(BidStatus::Pending.as_str())),
                )
                .set((
                    transport_bids::status.eq(BidStatus::Accepted.as_str()),
                    transport_bids::updated_at.eq(now),
                ))
                .get_result::<TransportBid>(conn)
                .optional()?
                .ok_or(StoreError::Conflict("Bid is no longer pending"))?;

                Ok(Some((job, bid)))
            })
        })
        .await
    }

    async fn insert_support_message(&self, message: SupportMessage) -> StoreResult<SupportMessage> {
        self.run(move |conn| {
            Ok(diesel::insert_into(support_messages::table)
                .values(&message)
                .get_result::<SupportMessage>(conn)?)
        })
        .await
    }

    async fn list_support_messages(&self) -> StoreResult<Vec<SupportMessage>> {
        self.run(|conn| {
            Ok(support_messages::table
                .order(support_messages::created_at.desc())
                .load::<SupportMessage>(conn)?)
        })
        .await
    }

    async fn insert_activity(&self, entry: ActivityLog) -> StoreResult<()> {
        self.run(move |conn| {
            diesel::insert_into(activity_logs::table)
                .values(&entry)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn list_activity(&self, limit: i64) -> StoreResult<Vec<ActivityLog>> {
        self.run(move |conn| {
            Ok(activity_logs::table
                .order(activity_logs::created_at.desc())
                .limit(limit)
                .load::<ActivityLog>(conn)?)
        })
        .await
    }

    async fn platform_stats(&self) -> StoreResult<PlatformStats> {
        self.run(|conn| {
            let total_users: i64 = users::table.count().get_result(conn)?;
            let total_orders: i64 = orders::table.count().get_result(conn)?;
            let total_revenue: Option<f64> = orders::table
                .filter(orders::status.ne(OrderStatus::Cancelled.as_str()))
                .select(diesel::dsl::sum(orders::total_amount))
                .get_result(conn)?;
            let active_listings: i64 = listings::table
                .filter(listings::status.eq(ListingStatus::Approved.as_str()))
                .count()
                .get_result(conn)?;
            let order_status_counts = orders::table
                .group_by(orders::status)
                .select((orders::status, diesel::dsl::count_star()))
                .load::<(String, i64)>(conn)?
                .into_iter()
                .collect();

            Ok(PlatformStats {
                total_users,
                total_farmers: count_role(conn, "farmer")?,
                total_buyers: count_role(conn, "buyer")?,
                total_transporters: count_role(conn, "transporter")?,
                total_orders,
                total_revenue: total_revenue.unwrap_or(0.0),
                active_listings,
                order_status_counts,
            })
        })
        .await
    }
}
