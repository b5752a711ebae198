//! Fixtures for service tests. Rows are inserted through the repositories so
//! a test only exercises the service it is about.

use chrono::{NaiveDate, Utc};
use shared::{Gender, Role};

use crate::domain::models::{Child, Guardian, User, Vaccine};
use crate::storage::repositories::{child_repository, guardian_repository, user_repository, vaccine_repository};
use crate::storage::DbConnection;

pub async fn setup_db() -> DbConnection {
    DbConnection::init_test().await.expect("Failed to create test database")
}

pub async fn seed_user(db: &DbConnection, username: &str, role: Role) -> User {
    let now = Utc::now();
    let mut user = User {
        id: 0,
        username: username.to_string(),
        email: format!("{}@clinic.test", username),
        password_hash: "not-a-real-hash".to_string(),
        full_name: format!("{} Example", username),
        role,
        active: true,
        created_at: now,
        updated_at: now,
    };
    let mut conn = db.acquire().await.unwrap();
    user.id = user_repository::insert(&mut conn, &user).await.unwrap();
    user
}

pub async fn seed_child(db: &DbConnection, document_number: &str, birth_date: NaiveDate) -> Child {
    let now = Utc::now();
    let mut child = Child {
        id: 0,
        first_name: "Lucia".to_string(),
        last_name: format!("Child-{}", document_number),
        document_number: document_number.to_string(),
        birth_date,
        gender: Gender::Female,
        blood_type: None,
        birth_weight_kg: None,
        birth_height_cm: None,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    };
    let mut conn = db.acquire().await.unwrap();
    child.id = child_repository::insert(&mut conn, &child).await.unwrap();
    child
}

pub async fn seed_deleted_child(db: &DbConnection, document_number: &str) -> Child {
    let mut child = seed_child(db, document_number, date(2023, 1, 1)).await;
    child.deleted_at = Some(Utc::now());
    let mut conn = db.acquire().await.unwrap();
    child_repository::update(&mut conn, &child).await.unwrap();
    child
}

pub async fn seed_guardian(db: &DbConnection, document_number: &str) -> Guardian {
    let now = Utc::now();
    let mut guardian = Guardian {
        id: 0,
        first_name: "Marta".to_string(),
        last_name: format!("Guardian-{}", document_number),
        document_number: document_number.to_string(),
        phone: "+57 300 000 0000".to_string(),
        email: None,
        address: None,
        relationship: "Mother".to_string(),
        created_at: now,
        updated_at: now,
    };
    let mut conn = db.acquire().await.unwrap();
    guardian.id = guardian_repository::insert(&mut conn, &guardian).await.unwrap();
    guardian
}

pub async fn seed_vaccine(db: &DbConnection, name: &str, dose_count: i32) -> Vaccine {
    let now = Utc::now();
    let mut vaccine = Vaccine {
        id: 0,
        name: name.to_string(),
        disease_prevented: format!("{} disease", name),
        manufacturer: None,
        description: None,
        dose_count,
        min_age_months: 0,
        min_storage_temp: 2.0,
        max_storage_temp: 8.0,
        active: true,
        created_at: now,
        updated_at: now,
    };
    let mut conn = db.acquire().await.unwrap();
    vaccine.id = vaccine_repository::insert(&mut conn, &vaccine).await.unwrap();
    vaccine
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
