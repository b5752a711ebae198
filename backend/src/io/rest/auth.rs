//! Bearer-token authentication and role checks.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use shared::Role;
use tracing::{debug, warn};

use super::error::ApiError;
use crate::AppState;

pub const ANY_ROLE: &[Role] = &[Role::Doctor, Role::Nurse, Role::Parent];
pub const STAFF: &[Role] = &[Role::Doctor, Role::Nurse];
pub const DOCTOR_ONLY: &[Role] = &[Role::Doctor];

/// The caller, taken from a valid `Authorization: Bearer` header and the
/// account it names, which must still be active
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require_any(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            warn!("{} ({}) denied, needs one of {:?}", self.username, self.role, roles);
            Err(ApiError::Forbidden(format!(
                "Role {} is not allowed to perform this action",
                self.role
            )))
        }
    }

    pub fn is_staff(&self) -> bool {
        STAFF.contains(&self.role)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Authorization header must use the Bearer scheme".to_string()))?;

        let claims = state.auth_service.verify(token)?;

        // Deactivation and role changes apply to tokens already issued
        let account = state.auth_service.current_user(claims.user_id).await?;
        if account.role != claims.role {
            debug!("Token role {} for {} superseded by {}", claims.role, account.username, account.role);
        }

        Ok(AuthUser {
            user_id: account.id,
            username: account.username,
            role: account.role,
        })
    }
}
