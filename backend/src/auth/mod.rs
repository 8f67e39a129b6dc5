use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::roles::Role;
use crate::state::AppState;

pub mod admin;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

/// Caller identity attached to the request by [`authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require(&self, role: Role) -> Result<(), AppError> {
        self.require_any(&[role])
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            log::warn!("User {} ({}) denied; needs one of {:?}", self.email, self.role, roles);
            Err(AppError::Forbidden(format!(
                "This action is not available to the {} role",
                self.role
            )))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn create_token(
    user: &AuthUser,
    jwt_secret: &str,
    ttl_hours: u64,
) -> Result<String, AppError> {
    let expiration = i64::try_from(ttl_hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .and_then(|exp| usize::try_from(exp.timestamp()).ok())
        .ok_or_else(|| {
            AppError::internal(
                "Failed to issue token",
                format!("token lifetime of {ttl_hours}h is out of range"),
            )
        })?;

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        exp: expiration,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_bytes()))
        .map_err(|e| AppError::internal("Failed to issue token", e))
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<AuthUser, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        log::debug!("Token rejected: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;
    let claims = token_data.claims;
    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
    Ok(AuthUser {
        id,
        email: claims.email,
        role: claims.role,
    })
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    bcrypt::hash(password, cost).map_err(|e| AppError::internal("Failed to hash password", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Bearer-token guard for the protected router.
pub async fn authenticate(
    headers: HeaderMap,
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;
    let token = auth_header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized("Invalid Authorization header format".to_string())
        })?;
    let user = validate_token(token.trim(), &state.config.jwt_secret)?;

    // Tokens outlive suspension and deletion, so the profile is checked per request.
    match state.store.get_profile(user.id).await? {
        Some(profile) if profile.is_suspended() => {
            log::warn!("Rejected request from suspended user {}", user.email);
            return Err(AppError::Forbidden("Your account has been suspended".to_string()));
        }
        Some(_) => {}
        None => {
            return Err(AppError::Unauthorized("Account no longer exists".to_string()));
        }
    }
    log::debug!("Authenticated user: {} as {}", user.email, user.role);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "grace@example.com".into(),
            role,
        }
    }

    #[test]
    fn token_round_trip_keeps_identity() {
        let u = user(Role::Farmer);
        let token = create_token(&u, "secret", 1).unwrap();
        let back = validate_token(&token, "secret").unwrap();
        assert_eq!(back, u);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = create_token(&user(Role::Buyer), "secret", 1).unwrap();
        let err = validate_token(&token, "other").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn role_guard() {
        let u = user(Role::Transporter);
        assert!(u.require(Role::Transporter).is_ok());
        assert!(u.require_any(&[Role::Farmer, Role::Buyer]).is_err());
        assert!(!u.is_admin());
    }

    #[test]
    fn absurd_token_lifetime_is_an_error_not_a_panic() {
        let err = create_token(&user(Role::Buyer), "secret", u64::MAX).unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
        assert!(create_token(&user(Role::Buyer), "secret", 24 * 365).is_ok());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter2", 4).unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }
}
