use chrono::Utc;
use shared::{ChangePasswordRequest, CreateUserRequest, Role, UpdateUserRequest};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::domain::auth_service::{hash_password, verify_password};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::User;
use crate::domain::validation::FieldErrors;
use crate::storage::repositories::user_repository;
use crate::storage::DbConnection;

/// bcrypt only looks at the first 72 bytes
const MAX_PASSWORD_LEN: usize = 72;
const MIN_PASSWORD_LEN: usize = 8;

/// Fields for a new account, before hashing
pub(crate) struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: &'a str,
    pub role: Role,
}

/// Validate the fields and hash the password. Runs before any transaction.
pub(crate) async fn prepare_account(account: NewAccount<'_>, bcrypt_cost: u32) -> DomainResult<User> {
    let mut errors = FieldErrors::new();
    check_username(&mut errors, account.username);
    check_email(&mut errors, account.email);
    check_password(&mut errors, "password", account.password);
    errors.require_text("full_name", account.full_name, 100);
    errors.into_result()?;

    let now = Utc::now();
    Ok(User {
        id: 0,
        username: account.username.trim().to_string(),
        email: account.email.trim().to_lowercase(),
        password_hash: hash_password(account.password, bcrypt_cost).await?,
        full_name: account.full_name.trim().to_string(),
        role: account.role,
        active: true,
        created_at: now,
        updated_at: now,
    })
}

/// Check uniqueness and insert a prepared account on `conn`
pub(crate) async fn insert_account(conn: &mut SqliteConnection, mut user: User) -> DomainResult<User> {
    if user_repository::username_in_use(conn, &user.username).await? {
        return Err(DomainError::duplicate(format!("Username {} is already taken", user.username)));
    }
    if user_repository::email_in_use(conn, &user.email, None).await? {
        return Err(DomainError::duplicate(format!("Email {} is already registered", user.email)));
    }

    user.id = user_repository::insert(conn, &user).await?;

    info!("Created {} account {} with ID: {}", user.role, user.username, user.id);
    Ok(user)
}

/// Service for staff and parent accounts
#[derive(Clone)]
pub struct UserService {
    db: DbConnection,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(db: DbConnection, bcrypt_cost: u32) -> Self {
        Self { db, bcrypt_cost }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> DomainResult<User> {
        info!("Creating user: {} ({})", request.username, request.role);

        let user = prepare_account(
            NewAccount {
                username: &request.username,
                email: &request.email,
                password: &request.password,
                full_name: &request.full_name,
                role: request.role,
            },
            self.bcrypt_cost,
        )
        .await?;

        let mut tx = self.db.begin().await?;
        let user = insert_account(&mut tx, user).await?;
        tx.commit().await?;

        Ok(user)
    }

    pub async fn get_user(&self, user_id: i64) -> DomainResult<User> {
        let mut conn = self.db.acquire().await?;
        Self::load_user(&mut conn, user_id).await
    }

    pub async fn list_users(&self) -> DomainResult<Vec<User>> {
        let mut conn = self.db.acquire().await?;
        Ok(user_repository::list(&mut conn).await?)
    }

    pub async fn list_by_role(&self, role: Role) -> DomainResult<Vec<User>> {
        let mut conn = self.db.acquire().await?;
        Ok(user_repository::list_by_role(&mut conn, role).await?)
    }

    pub async fn update_user(&self, user_id: i64, request: UpdateUserRequest) -> DomainResult<User> {
        info!("Updating user: {}", user_id);

        let mut errors = FieldErrors::new();
        if let Some(email) = request.email.as_deref() {
            check_email(&mut errors, email);
        }
        errors.optional_text("full_name", request.full_name.as_deref(), 100);
        errors.into_result()?;

        let mut tx = self.db.begin().await?;
        let mut user = Self::load_user(&mut tx, user_id).await?;

        if let Some(email) = request.email {
            let email = email.trim().to_lowercase();
            if email != user.email && user_repository::email_in_use(&mut *tx, &email, Some(user_id)).await? {
                return Err(DomainError::duplicate(format!("Email {} is already registered", email)));
            }
            user.email = email;
        }
        if let Some(full_name) = request.full_name {
            user.full_name = full_name.trim().to_string();
        }
        if let Some(role) = request.role {
            user.role = role;
        }
        if let Some(active) = request.active {
            user.active = active;
        }
        user.updated_at = Utc::now();

        user_repository::update(&mut *tx, &user).await?;
        tx.commit().await?;

        Ok(user)
    }

    /// Accounts are never removed, only switched off
    pub async fn deactivate_user(&self, user_id: i64) -> DomainResult<User> {
        info!("Deactivating user: {}", user_id);

        let mut tx = self.db.begin().await?;
        let mut user = Self::load_user(&mut tx, user_id).await?;

        if user.active {
            user.active = false;
            user.updated_at = Utc::now();
            user_repository::update(&mut *tx, &user).await?;
        }
        tx.commit().await?;

        Ok(user)
    }

    pub async fn change_password(&self, user_id: i64, request: ChangePasswordRequest) -> DomainResult<()> {
        info!("Changing password for user: {}", user_id);

        let mut errors = FieldErrors::new();
        check_password(&mut errors, "new_password", &request.new_password);
        errors.into_result()?;

        let current = self.get_user(user_id).await?;
        if !verify_password(&request.current_password, &current.password_hash).await {
            warn!("Password change for user {} rejected: current password mismatch", user_id);
            return Err(DomainError::Authentication("Current password is incorrect".to_string()));
        }
        let password_hash = hash_password(&request.new_password, self.bcrypt_cost).await?;

        let mut tx = self.db.begin().await?;
        let mut user = Self::load_user(&mut tx, user_id).await?;
        user.password_hash = password_hash;
        user.updated_at = Utc::now();
        user_repository::update(&mut *tx, &user).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn load_user(conn: &mut SqliteConnection, user_id: i64) -> DomainResult<User> {
        user_repository::find_by_id(conn, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))
    }
}

fn check_username(errors: &mut FieldErrors, username: &str) {
    let username = username.trim();
    if username.chars().count() < 3 || username.chars().count() > 50 {
        errors.add("username", "must be between 3 and 50 characters");
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        errors.add("username", "may only contain letters, digits, '.', '_' and '-'");
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    errors.require_text("email", email, 255);
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ if email.is_empty() => {}
        _ => errors.add("email", "must be a valid email address"),
    }
}

fn check_password(errors: &mut FieldErrors, field: &str, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(field, format!("must be at least {} characters", MIN_PASSWORD_LEN));
    } else if password.len() > MAX_PASSWORD_LEN {
        errors.add(field, format!("must be at most {} bytes", MAX_PASSWORD_LEN));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::setup_db;

    const TEST_COST: u32 = 4;

    fn request(username: &str, role: Role) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: format!("{}@clinic.test", username),
            password: "correct horse".to_string(),
            full_name: "Laura Medina".to_string(),
            role,
        }
    }

    #[test]
    fn test_field_checks() {
        let mut errors = FieldErrors::new();
        check_username(&mut errors, "ab");
        check_email(&mut errors, "nobody");
        check_password(&mut errors, "password", "short");
        let map = errors.into_map();
        assert_eq!(map.len(), 3);

        let mut errors = FieldErrors::new();
        check_username(&mut errors, "dr.medina");
        check_email(&mut errors, "dr@clinic.org");
        check_password(&mut errors, "password", "long enough");
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_create_hashes_password_and_rejects_duplicates() {
        let service = UserService::new(setup_db().await, TEST_COST);

        let user = service.create_user(request("nurse.joy", Role::Nurse)).await.unwrap();
        assert_ne!(user.password_hash, "correct horse");
        assert!(verify_password("correct horse", &user.password_hash).await);

        let err = service.create_user(request("nurse.joy", Role::Nurse)).await.unwrap_err();
        assert!(matches!(err, DomainError::Duplicate(_)));

        let mut same_email = request("other", Role::Nurse);
        same_email.email = "NURSE.JOY@clinic.test".to_string();
        let err = service.create_user(same_email).await.unwrap_err();
        assert!(matches!(err, DomainError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_update_deactivate_and_list_by_role() {
        let service = UserService::new(setup_db().await, TEST_COST);
        let doctor = service.create_user(request("dr.house", Role::Doctor)).await.unwrap();
        service.create_user(request("nurse.joy", Role::Nurse)).await.unwrap();

        let updated = service
            .update_user(
                doctor.id,
                UpdateUserRequest {
                    full_name: Some("Gregory House".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Gregory House");

        let deactivated = service.deactivate_user(doctor.id).await.unwrap();
        assert!(!deactivated.active);
        assert!(!service.get_user(doctor.id).await.unwrap().active);

        assert_eq!(service.list_by_role(Role::Nurse).await.unwrap().len(), 1);
        assert_eq!(service.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_change_password_requires_current_password() {
        let service = UserService::new(setup_db().await, TEST_COST);
        let user = service.create_user(request("parent1", Role::Parent)).await.unwrap();

        let err = service
            .change_password(
                user.id,
                ChangePasswordRequest {
                    current_password: "wrong password".to_string(),
                    new_password: "brand new secret".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Authentication(_)));

        service
            .change_password(
                user.id,
                ChangePasswordRequest {
                    current_password: "correct horse".to_string(),
                    new_password: "brand new secret".to_string(),
                },
            )
            .await
            .unwrap();

        let stored = service.get_user(user.id).await.unwrap();
        assert!(verify_password("brand new secret", &stored.password_hash).await);
    }
}
