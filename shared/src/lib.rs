use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Error returned when a stored or requested enum label is not recognised
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` using the SCREAMING_SNAKE_CASE
/// labels that also appear on the wire and in the database.
macro_rules! labelled_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($label => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

/// Account role used for endpoint authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Doctor,
    Nurse,
    Parent,
}

labelled_enum!(Role, "role", {
    Doctor => "DOCTOR",
    Nurse => "NURSE",
    Parent => "PARENT",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

labelled_enum!(Gender, "gender", {
    Male => "MALE",
    Female => "FEMALE",
    Other => "OTHER",
});

/// Status of a received vaccine batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    Available,
    Reserved,
    Depleted,
    Expired,
    Recalled,
}

labelled_enum!(InventoryStatus, "inventory status", {
    Available => "AVAILABLE",
    Reserved => "RESERVED",
    Depleted => "DEPLETED",
    Expired => "EXPIRED",
    Recalled => "RECALLED",
});

/// Status of an appointment.
///
/// The usual flow is SCHEDULED -> CONFIRMED -> COMPLETED with CANCELLED
/// reachable from the first two, but the backend accepts any transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

labelled_enum!(AppointmentStatus, "appointment status", {
    Scheduled => "SCHEDULED",
    Confirmed => "CONFIRMED",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
    NoShow => "NO_SHOW",
});

impl AppointmentStatus {
    /// Whether the status ends the usual lifecycle. Informational only.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

/// Structured error body returned for every failed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    /// Category label, e.g. NOT_FOUND or BUSINESS_RULE_VIOLATION
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<BTreeMap<String, String>>,
}

/// Generic count payload used by the various `/count` endpoints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}

// ---------------------------------------------------------------------------
// Auth & users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public self-registration. Always creates a PARENT account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// A user account as exposed over the API (never carries the password hash)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
}

// ---------------------------------------------------------------------------
// Children & guardians
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub blood_type: Option<String>,
    pub birth_weight_kg: Option<f64>,
    pub birth_height_cm: Option<f64>,
    /// Whole months elapsed since birth, computed at response time
    pub age_in_months: u32,
    /// Set when the child has been soft-deleted
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateChildRequest {
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub birth_weight_kg: Option<f64>,
    #[serde(default)]
    pub birth_height_cm: Option<f64>,
    /// Guardians to link while registering the child
    #[serde(default)]
    pub guardian_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateChildRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_type: Option<String>,
    pub birth_weight_kg: Option<f64>,
    pub birth_height_cm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildListResponse {
    pub children: Vec<Child>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildAgeResponse {
    pub child_id: i64,
    pub birth_date: NaiveDate,
    pub age_in_months: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkGuardianRequest {
    pub guardian_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guardian {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Free-form relationship label, e.g. "Mother" or "Legal guardian"
    pub relationship: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateGuardianRequest {
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub relationship: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateGuardianRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianListResponse {
    pub guardians: Vec<Guardian>,
}

// ---------------------------------------------------------------------------
// Vaccines & schedules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vaccine {
    pub id: i64,
    pub name: String,
    pub disease_prevented: String,
    pub manufacturer: Option<String>,
    pub description: Option<String>,
    pub dose_count: i32,
    pub min_age_months: i32,
    /// Storage range in degrees Celsius
    pub min_storage_temp: f64,
    pub max_storage_temp: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateVaccineRequest {
    pub name: String,
    pub disease_prevented: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub dose_count: i32,
    pub min_age_months: i32,
    pub min_storage_temp: f64,
    pub max_storage_temp: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateVaccineRequest {
    pub name: Option<String>,
    pub disease_prevented: Option<String>,
    pub manufacturer: Option<String>,
    pub description: Option<String>,
    pub dose_count: Option<i32>,
    pub min_age_months: Option<i32>,
    pub min_storage_temp: Option<f64>,
    pub max_storage_temp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccineListResponse {
    pub vaccines: Vec<Vaccine>,
}

/// Recommended timing of one dose in a country's immunization plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationSchedule {
    pub id: i64,
    pub vaccine_id: i64,
    pub country_code: String,
    pub dose_number: i32,
    pub age_months: i32,
    pub mandatory: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub vaccine_id: i64,
    pub country_code: String,
    pub dose_number: i32,
    pub age_months: i32,
    #[serde(default = "default_true")]
    pub mandatory: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub age_months: Option<i32>,
    pub mandatory: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleListResponse {
    pub schedules: Vec<VaccinationSchedule>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Vaccination records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationRecord {
    pub id: i64,
    pub child_id: i64,
    pub vaccine_id: i64,
    pub dose_number: i32,
    pub batch_number: String,
    pub administered_by: i64,
    pub administered_on: NaiveDate,
    pub next_dose_date: Option<NaiveDate>,
    pub site: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The administering user is taken from the bearer token, not the body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateVaccinationRecordRequest {
    pub child_id: i64,
    pub vaccine_id: i64,
    pub dose_number: i32,
    pub batch_number: String,
    pub administered_on: NaiveDate,
    #[serde(default)]
    pub next_dose_date: Option<NaiveDate>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateVaccinationRecordRequest {
    pub next_dose_date: Option<NaiveDate>,
    pub site: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationRecordListResponse {
    pub records: Vec<VaccinationRecord>,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryBatch {
    pub id: i64,
    pub vaccine_id: i64,
    pub batch_number: String,
    pub quantity: i32,
    pub expiration_date: NaiveDate,
    pub received_date: NaiveDate,
    pub supplier: Option<String>,
    pub status: InventoryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateInventoryRequest {
    pub vaccine_id: i64,
    pub batch_number: String,
    pub quantity: i32,
    pub expiration_date: NaiveDate,
    /// Defaults to today
    #[serde(default)]
    pub received_date: Option<NaiveDate>,
    #[serde(default)]
    pub supplier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustQuantityRequest {
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateInventoryStatusRequest {
    pub status: InventoryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryListResponse {
    pub batches: Vec<InventoryBatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTotalResponse {
    pub vaccine_id: i64,
    pub total_available: i64,
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub child_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
    pub created_by: i64,
    pub assigned_to: Option<i64>,
    pub vaccine_id: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The creating user is taken from the bearer token, not the body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub child_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub vaccine_id: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub assigned_to: Option<i64>,
    pub notes: Option<String>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<Appointment>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: Option<i64>,
    pub guardian_id: Option<i64>,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Exactly one of `user_id` and `guardian_id` must be set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNotificationRequest {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub guardian_id: Option<i64>,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
}
