use shared::{AuthResponse, User as SharedUser, UserListResponse};

use crate::domain::auth_service::IssuedToken;
use crate::domain::models::User as DomainUser;

/// The password hash never leaves the backend
pub struct UserMapper;

impl UserMapper {
    pub fn to_dto(domain: DomainUser) -> SharedUser {
        SharedUser {
            id: domain.id,
            username: domain.username,
            email: domain.email,
            full_name: domain.full_name,
            role: domain.role,
            active: domain.active,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }

    pub fn to_list_dto(users: Vec<DomainUser>) -> UserListResponse {
        UserListResponse {
            users: users.into_iter().map(Self::to_dto).collect(),
        }
    }

    pub fn to_auth_dto(user: DomainUser, issued: IssuedToken) -> AuthResponse {
        AuthResponse {
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_at: issued.expires_at,
            user: Self::to_dto(user),
        }
    }
}
