//! Login, registration and bearer tokens.
//!
//! Tokens are HS256 JWTs signed with the configured secret. They carry the
//! user id, username and role so the REST layer can authorize a request
//! without a database round trip.

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{LoginRequest, RegisterRequest, Role};
use tracing::{info, warn};

use crate::config::{AuthConfig, BootstrapAdmin};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::User;
use crate::domain::user_service::{insert_account, prepare_account, NewAccount};
use crate::storage::repositories::user_repository;
use crate::storage::DbConnection;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// JWT payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub user_id: i64,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// bcrypt is CPU bound, so it runs on the blocking pool
pub async fn hash_password(password: &str, cost: u32) -> DomainResult<String> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("Password hashing task failed")?
        .context("Failed to hash password")?;
    Ok(hash)
}

/// A malformed stored hash counts as a mismatch
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct AuthService {
    db: DbConnection,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(db: DbConnection, config: AuthConfig) -> Self {
        Self { db, config }
    }

    /// Public sign-up. Always creates a PARENT account.
    pub async fn register(&self, request: RegisterRequest) -> DomainResult<(User, IssuedToken)> {
        info!("Registering parent account: {}", request.username);

        let user = prepare_account(
            NewAccount {
                username: &request.username,
                email: &request.email,
                password: &request.password,
                full_name: &request.full_name,
                role: Role::Parent,
            },
            self.config.bcrypt_cost,
        )
        .await?;

        let mut tx = self.db.begin().await?;
        let user = insert_account(&mut tx, user).await?;
        tx.commit().await?;

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    pub async fn login(&self, request: LoginRequest) -> DomainResult<(User, IssuedToken)> {
        info!("Login attempt: {}", request.username);

        let mut conn = self.db.acquire().await?;
        let user = user_repository::find_by_username(&mut conn, request.username.trim()).await?;
        drop(conn);

        // Same error whichever field was wrong
        let verified = match &user {
            Some(user) => verify_password(&request.password, &user.password_hash).await,
            None => false,
        };
        let user = match user {
            Some(user) if verified => user,
            _ => {
                warn!("Login failed for {}", request.username);
                return Err(DomainError::Authentication(INVALID_CREDENTIALS.to_string()));
            }
        };
        if !user.active {
            warn!("Login refused for inactive user {}", user.username);
            return Err(DomainError::Authentication("Account is disabled".to_string()));
        }

        let token = self.issue_token(&user)?;
        info!("User {} logged in", user.username);
        Ok((user, token))
    }

    pub fn issue_token(&self, user: &User) -> DomainResult<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.token_ttl_hours);
        let claims = Claims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .context("Failed to sign token")?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Decode and validate a bearer token, including its expiry
    pub fn verify(&self, token: &str) -> DomainResult<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            DomainError::Authentication("Invalid or expired token".to_string())
        })?;

        Ok(data.claims)
    }

    /// The account behind a verified token, which must still be active
    pub async fn current_user(&self, user_id: i64) -> DomainResult<User> {
        let mut conn = self.db.acquire().await?;
        match user_repository::find_by_id(&mut conn, user_id).await? {
            Some(user) if user.active => Ok(user),
            _ => Err(DomainError::Authentication("Account is no longer active".to_string())),
        }
    }

    /// Create the first DOCTOR account when the user table is empty
    pub async fn bootstrap_admin(&self, admin: &BootstrapAdmin) -> DomainResult<Option<User>> {
        if self.has_users().await? {
            info!("Users already exist, skipping bootstrap account");
            return Ok(None);
        }

        let user = prepare_account(
            NewAccount {
                username: &admin.username,
                email: &admin.email,
                password: &admin.password,
                full_name: "Administrator",
                role: Role::Doctor,
            },
            self.config.bcrypt_cost,
        )
        .await?;

        let mut tx = self.db.begin().await?;
        if user_repository::count(&mut *tx).await? > 0 {
            return Ok(None);
        }
        let user = insert_account(&mut tx, user).await?;
        tx.commit().await?;

        info!("Created bootstrap DOCTOR account {}", user.username);
        Ok(Some(user))
    }

    async fn has_users(&self) -> DomainResult<bool> {
        let mut conn = self.db.acquire().await?;
        Ok(user_repository::count(&mut conn).await? > 0)
    }
}
