use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::{record_activity, require_text, AppJson, StatusUpdate};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{
    ActivityLog, JobStatus, NewTransportBid, NewTransportJob, TransportBid, TransportJob,
    UnknownStatus,
};
use crate::roles::Role;
use crate::state::AppState;
use crate::store::JobFilter;

#[derive(Debug, Serialize)]
pub struct AcceptedBid {
    pub job: TransportJob,
    pub bid: TransportBid,
}

fn job_status(job: &TransportJob) -> Result<JobStatus, AppError> {
    job.status
        .parse()
        .map_err(|e: UnknownStatus| AppError::internal("Job has an unreadable status", e))
}

async fn load_job(state: &AppState, id: Uuid) -> Result<TransportJob, AppError> {
    state
        .store
        .get_job(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Transport job not found".to_string()))
}

/// Who may move a job from `current` to `target`.
///
/// The assigned transporter walks `assigned -> in_progress -> completed`;
/// the poster may cancel while the job is still open. Admins set anything.
pub fn authorize_job_transition(
    user: &AuthUser,
    job: &TransportJob,
    current: JobStatus,
    target: JobStatus,
) -> Result<(), AppError> {
    if user.is_admin() {
        return Ok(());
    }
    if job.farmer_id == user.id {
        return match (current, target) {
            (JobStatus::Open, JobStatus::Cancelled) => Ok(()),
            _ => Err(AppError::Conflict(format!(
                "Cannot move job from {current} to {target}"
            ))),
        };
    }
    if user.role == Role::Transporter && job.assigned_transporter_id == Some(user.id) {
        return if current.next_haul_step() == Some(target) {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "Cannot move job from {current} to {target}"
            )))
        };
    }
    Err(AppError::Forbidden("Not your transport job".to_string()))
}

pub async fn create_job(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(new_job): AppJson<NewTransportJob>,
) -> Result<(StatusCode, Json<TransportJob>), AppError> {
    user.require_any(&[Role::Farmer, Role::Buyer])?;
    require_text(&new_job.title, "Title")?;
    require_text(&new_job.pickup_location, "Pickup location")?;
    require_text(&new_job.delivery_location, "Delivery location")?;
    if new_job.weight_kg.is_some_and(|w| w < 0.0) {
        return Err(AppError::BadRequest("Weight cannot be negative".to_string()));
    }
    if new_job.budget_amount.is_some_and(|b| b < 0.0) {
        return Err(AppError::BadRequest("Budget cannot be negative".to_string()));
    }

    let job = state.store.insert_job(new_job.into_record(user.id)).await?;
    log::info!(
        "{} posted transport job {} ({} -> {})",
        user.email,
        job.id,
        job.pickup_location,
        job.delivery_location
    );
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<TransportJob>>, AppError> {
    let filter = match user.role {
        Role::Admin => JobFilter::All,
        Role::Transporter => JobFilter::VisibleTo(user.id),
        Role::Farmer | Role::Buyer => JobFilter::PostedBy(user.id),
    };
    Ok(Json(state.store.list_jobs(filter).await?))
}

pub async fn submit_bid(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
    AppJson(new_bid): AppJson<NewTransportBid>,
) -> Result<(StatusCode, Json<TransportBid>), AppError> {
    user.require(Role::Transporter)?;
    if !(new_bid.bid_amount.is_finite() && new_bid.bid_amount > 0.0) {
        return Err(AppError::BadRequest("Bid amount must be greater than zero".to_string()));
    }
    if new_bid.estimated_duration_hours.is_some_and(|h| h < 0) {
        return Err(AppError::BadRequest("Duration cannot be negative".to_string()));
    }
    let job = load_job(&state, job_id).await?;
    if job_status(&job)? != JobStatus::Open {
        return Err(AppError::Conflict("Job is no longer open for bids".to_string()));
    }

    let bid = state
        .store
        .insert_bid(new_bid.into_record(job.id, user.id))
        .await?;
    log::info!("{} bid {:.2} on job {}", user.email, bid.bid_amount, job.id);
    Ok((StatusCode::CREATED, Json(bid)))
}

pub async fn list_bids(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Vec<TransportBid>>, AppError> {
    let job = load_job(&state, job_id).await?;
    let mut bids = state.store.list_bids(job.id).await?;
    if user.is_admin() || job.farmer_id == user.id {
        return Ok(Json(bids));
    }
    if user.role == Role::Transporter {
        bids.retain(|b| b.transporter_id == user.id);
        return Ok(Json(bids));
    }
    Err(AppError::Forbidden("Not your transport job".to_string()))
}

pub async fn accept_bid(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((job_id, bid_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<AcceptedBid>, AppError> {
    let job = load_job(&state, job_id).await?;
    if !(user.is_admin() || job.farmer_id == user.id) {
        return Err(AppError::Forbidden(
            "Only the job owner can accept bids".to_string(),
        ));
    }
    if job_status(&job)? != JobStatus::Open {
        return Err(AppError::Conflict("Job already has a transporter".to_string()));
    }

    let (job, bid) = state
        .store
        .accept_bid(job_id, bid_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bid not found".to_string()))?;

    record_activity(
        &state,
        ActivityLog::record(
            user.id,
            "bid_accepted",
            "transport_job",
            job.id,
            json!({
                "bid_id": bid.id,
                "transporter_id": bid.transporter_id,
                "amount": bid.bid_amount,
            }),
        ),
    )
    .await;
    log::info!(
        "Job {} assigned to transporter {} at {:.2}",
        job.id,
        bid.transporter_id,
        bid.bid_amount
    );
    Ok(Json(AcceptedBid { job, bid }))
}

pub async fn update_job_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
    AppJson(update): AppJson<StatusUpdate>,
) -> Result<Json<TransportJob>, AppError> {
    let target: JobStatus = update.parse()?;
    let job = load_job(&state, job_id).await?;
    let current = job_status(&job)?;
    authorize_job_transition(&user, &job, current, target)?;

    let updated = state
        .store
        .set_job_status(job_id, target)
        .await?
        .ok_or_else(|| AppError::NotFound("Transport job not found".to_string()))?;

    record_activity(
        &state,
        ActivityLog::record(
            user.id,
            "job_status_changed",
            "transport_job",
            updated.id,
            json!({ "from": current, "to": target }),
        ),
    )
    .await;
    Ok(Json(updated))
}
