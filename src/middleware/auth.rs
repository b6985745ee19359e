//! JWT bearer-token authentication. The decoding secret comes from
//! application state, not a process-wide global.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Role;
use crate::state::AppState;

pub const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT claims as carried in the token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// User id as a string, per the standard `sub` field.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated identity, inserted into request extensions by
/// [`extract_current_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::authorization("Admin access required"))
        }
    }

    pub fn require_worker(&self) -> Result<()> {
        if self.role.can_work_tickets() {
            Ok(())
        } else {
            Err(AppError::authorization("Worker access required"))
        }
    }
}

/// Middleware: validate the bearer token and stash a [`CurrentUser`] in the
/// request extensions for handlers to pull out.
pub async fn extract_current_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::authentication("Authorization header must be in format: Bearer <token>")
        })?;

    let claims = verify_jwt_token(token, &state.config.auth.jwt_secret)?;
    let current_user = current_user_from_claims(&claims)?;

    request.extensions_mut().insert(current_user);
    Ok(next.run(request).await)
}

pub fn verify_jwt_token(token: &str, secret: &str) -> Result<JwtClaims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(JWT_ALGORITHM);

    decode::<JwtClaims>(token, &decoding_key, &validation)
        .map(|token_data| token_data.claims)
        .map_err(|e| {
            warn!("JWT validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::authentication("Token expired, please log in again")
                }
                _ => AppError::authentication("Invalid token"),
            }
        })
}

fn current_user_from_claims(claims: &JwtClaims) -> Result<CurrentUser> {
    let user_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| AppError::authentication("Invalid user id in token"))?;
    let role = Role::parse(&claims.role)
        .ok_or_else(|| AppError::authentication("Invalid role in token"))?;
    Ok(CurrentUser {
        user_id,
        email: claims.email.clone(),
        name: claims.name.clone(),
        role,
    })
}

/// Token minting, used by tests and local tooling.
pub fn issue_token(user: &crate::models::User, secret: &str, ttl_hours: i64) -> Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now();
    let claims = JwtClaims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role.as_str().to_string(),
        exp: (now + chrono::Duration::hours(ttl_hours)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::new(JWT_ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    #[test]
    fn issued_token_round_trips() {
        let user = User::new("Test", "test@example.com", Role::Worker);
        let token = issue_token(&user, "secret", 1).unwrap();
        let claims = verify_jwt_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, "worker");

        let current = current_user_from_claims(&claims).unwrap();
        assert_eq!(current.user_id, user.id);
        assert!(current.require_worker().is_ok());
        assert!(current.require_admin().is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let user = User::new("Test", "test@example.com", Role::User);
        let token = issue_token(&user, "secret", 1).unwrap();
        assert!(verify_jwt_token(&token, "other").is_err());
    }
}
