use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppJson;
use crate::auth::{self, AuthUser};
use crate::error::AppError;
use crate::models::{Account, UserProfile, UserRole};
use crate::roles::{resolve_role, Role};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    pub user: Account,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub redirect: &'static str,
    pub downgraded: bool,
    pub user: Account,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Account,
    pub role: Role,
    pub redirect: &'static str,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let role = req
        .role
        .as_deref()
        .and_then(|r| r.parse::<Role>().ok())
        .ok_or_else(|| {
            AppError::BadRequest(
                "Please select a role: farmer, buyer, transporter, or admin".to_string(),
            )
        })?;
    if role == Role::Admin && !state.admins.is_authorized_admin_email(&email) {
        log::warn!("Refused admin registration for {}", email);
        return Err(AppError::Forbidden(
            "You are not authorized to register as an admin".to_string(),
        ));
    }

    let password = req.password;
    let cost = state.config.bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || auth::hash_password(&password, cost))
        .await
        .map_err(|e| AppError::internal("Failed to hash password", e))??;

    let account = Account {
        id: Uuid::new_v4(),
        email,
        password_hash,
        full_name: req.full_name,
        phone: req.phone,
        location: req.location,
        signup_role: Some(role.to_string()),
        created_at: Utc::now(),
    };
    let role_row = UserRole::new(account.id, role.as_str());
    let profile = UserProfile::for_account(&account);
    let account = state.store.create_user(account, role_row, profile).await?;

    log::info!("Registered {} as {}", account.email, role);
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Account created!",
            user: account,
            role,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid login credentials".to_string());
    let email = normalize_email(&req.email);
    let account = state
        .store
        .find_account_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    let hash = account.password_hash.clone();
    let password = req.password;
    let verified = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::internal("Failed to verify password", e))?;
    if !verified {
        return Err(invalid());
    }

    if let Some(profile) = state.store.get_profile(account.id).await? {
        if profile.is_suspended() {
            return Err(AppError::Forbidden("Your account has been suspended".to_string()));
        }
    }

    let stored = match state.store.find_role(account.id).await {
        Ok(role) => role,
        Err(e) => {
            log::error!("Error fetching user role for {}: {}", account.email, e);
            None
        }
    };
    let resolution = resolve_role(
        stored.as_deref(),
        account.signup_role.as_deref(),
        &account.email,
        &state.admins,
    );
    if resolution.needs_persist() {
        if let Err(e) = state
            .store
            .insert_role(UserRole::new(account.id, resolution.role.as_str()))
            .await
        {
            log::warn!("Error creating user role for {}: {}", account.email, e);
        }
    }

    let user = AuthUser {
        id: account.id,
        email: account.email.clone(),
        role: resolution.role,
    };
    let token = auth::create_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_hours)?;

    log::info!("{} logged in as {}", account.email, resolution.role);
    Ok(Json(LoginResponse {
        token,
        role: resolution.role,
        redirect: resolution.redirect(),
        downgraded: resolution.downgraded,
        user: account,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>, AppError> {
    let account = state
        .store
        .get_account(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(MeResponse {
        user: account,
        role: user.role,
        redirect: user.role.dashboard_path(),
    }))
}
