//! # REST API for Vaccine Inventory
//!
//! Batches, stock adjustments and the expiry / low-stock views. Quantity
//! changes go through the service so the DEPLETED / AVAILABLE status follows
//! the stock level.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::{
    AdjustQuantityRequest, CreateInventoryRequest, InventoryStatus, SetQuantityRequest, StockTotalResponse,
    UpdateInventoryStatusRequest,
};
use tracing::info;

use crate::io::rest::auth::{AuthUser, DOCTOR_ONLY, STAFF};
use crate::io::rest::error::ApiResult;
use crate::io::rest::extract::{ApiJson, ApiPath, ApiQuery};
use crate::io::rest::mappers::InventoryMapper;
use crate::AppState;

const DEFAULT_EXPIRING_DAYS: i64 = 30;
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i32>,
}

/// Create a router for inventory related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_batches).post(create_batch))
        .route("/expiring", get(list_expiring))
        .route("/low-stock", get(list_low_stock))
        .route("/status/:status", get(list_by_status))
        .route("/vaccine/:vaccine_id", get(list_by_vaccine))
        .route("/vaccine/:vaccine_id/available", get(list_available))
        .route("/vaccine/:vaccine_id/total", get(total_available))
        .route("/:id", get(get_batch).delete(delete_batch))
        .route("/:id/quantity", put(set_quantity))
        .route("/:id/decrease", put(decrease_quantity))
        .route("/:id/increase", put(increase_quantity))
        .route("/:id/status", put(update_status))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Receive a new batch
pub async fn create_batch(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateInventoryRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /api/v1/inventory - request: {:?}", request);
    user.require_any(STAFF)?;

    let batch = state.inventory_service.create_batch(request).await?;
    Ok((StatusCode::CREATED, Json(InventoryMapper::to_dto(batch))))
}

pub async fn list_batches(State(state): State<AppState>, _user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/inventory");

    let batches = state.inventory_service.list_batches().await?;
    Ok(Json(InventoryMapper::to_list_dto(batches)))
}

pub async fn get_batch(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(batch_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/inventory/{}", batch_id);

    let batch = state.inventory_service.get_batch(batch_id).await?;
    Ok(Json(InventoryMapper::to_dto(batch)))
}

pub async fn delete_batch(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(batch_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("DELETE /api/v1/inventory/{}", batch_id);
    user.require_any(DOCTOR_ONLY)?;

    state.inventory_service.delete_batch(batch_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(batch_id): ApiPath<i64>,
    ApiJson(request): ApiJson<SetQuantityRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/inventory/{}/quantity - request: {:?}", batch_id, request);
    user.require_any(STAFF)?;

    let batch = state.inventory_service.set_quantity(batch_id, request.quantity).await?;
    Ok(Json(InventoryMapper::to_dto(batch)))
}

pub async fn decrease_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(batch_id): ApiPath<i64>,
    ApiJson(request): ApiJson<AdjustQuantityRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/inventory/{}/decrease - request: {:?}", batch_id, request);
    user.require_any(STAFF)?;

    let batch = state.inventory_service.decrease_quantity(batch_id, request.amount).await?;
    Ok(Json(InventoryMapper::to_dto(batch)))
}

pub async fn increase_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(batch_id): ApiPath<i64>,
    ApiJson(request): ApiJson<AdjustQuantityRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/inventory/{}/increase - request: {:?}", batch_id, request);
    user.require_any(STAFF)?;

    let batch = state.inventory_service.increase_quantity(batch_id, request.amount).await?;
    Ok(Json(InventoryMapper::to_dto(batch)))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(batch_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateInventoryStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/inventory/{}/status - request: {:?}", batch_id, request);
    user.require_any(STAFF)?;

    let batch = state.inventory_service.update_status(batch_id, request.status).await?;
    Ok(Json(InventoryMapper::to_dto(batch)))
}

pub async fn list_by_vaccine(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(vaccine_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/inventory/vaccine/{}", vaccine_id);

    let batches = state.inventory_service.list_by_vaccine(vaccine_id).await?;
    Ok(Json(InventoryMapper::to_list_dto(batches)))
}

/// Unexpired AVAILABLE batches with stock, soonest expiry first
pub async fn list_available(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(vaccine_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/inventory/vaccine/{}/available", vaccine_id);

    let batches = state.inventory_service.list_available(vaccine_id, today()).await?;
    Ok(Json(InventoryMapper::to_list_dto(batches)))
}

pub async fn total_available(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(vaccine_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/inventory/vaccine/{}/total", vaccine_id);

    let total_available = state.inventory_service.total_available(vaccine_id, today()).await?;
    Ok(Json(StockTotalResponse {
        vaccine_id,
        total_available,
    }))
}

pub async fn list_by_status(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(status): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/inventory/status/{}", status);

    let status: InventoryStatus = status.parse()?;
    let batches = state.inventory_service.list_by_status(status).await?;
    Ok(Json(InventoryMapper::to_list_dto(batches)))
}

pub async fn list_expiring(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<ExpiringQuery>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/inventory/expiring - query: {:?}", query);

    let days = query.days.unwrap_or(DEFAULT_EXPIRING_DAYS);
    let batches = state.inventory_service.list_expiring(today(), days).await?;
    Ok(Json(InventoryMapper::to_list_dto(batches)))
}

pub async fn list_low_stock(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<LowStockQuery>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/inventory/low-stock - query: {:?}", query);

    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let batches = state.inventory_service.list_low_stock(threshold).await?;
    Ok(Json(InventoryMapper::to_list_dto(batches)))
}

#[cfg(test)]
mod tests {
    use crate::io::rest::test_support::{json_request, read_json, request, test_app, token_for, TestResult};
    use axum::http::{Method, StatusCode};
    use chrono::{Duration, Utc};
    use shared::{
        AdjustQuantityRequest, CreateInventoryRequest, CreateVaccineRequest, ErrorResponse, InventoryBatch,
        InventoryListResponse, InventoryStatus, Role, SetQuantityRequest, StockTotalResponse,
    };
    use tower::ServiceExt;

    use crate::AppState;

    async fn seed_vaccine(state: &AppState) -> Result<i64, Box<dyn std::error::Error>> {
        let vaccine = state
            .vaccine_service
            .create_vaccine(CreateVaccineRequest {
                name: "Polio (IPV)".to_string(),
                disease_prevented: "Poliomyelitis".to_string(),
                manufacturer: None,
                description: None,
                dose_count: 4,
                min_age_months: 2,
                min_storage_temp: 2.0,
                max_storage_temp: 8.0,
            })
            .await?;
        Ok(vaccine.id)
    }

    fn batch_request(vaccine_id: i64, batch_number: &str, quantity: i32, expires_in_days: i64) -> CreateInventoryRequest {
        CreateInventoryRequest {
            vaccine_id,
            batch_number: batch_number.to_string(),
            quantity,
            expiration_date: Utc::now().date_naive() + Duration::days(expires_in_days),
            received_date: None,
            supplier: Some("PAHO Revolving Fund".to_string()),
        }
    }

    #[tokio::test]
    async fn test_decrease_and_increase_flow() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        let vaccine_id = seed_vaccine(&state).await?;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/inventory",
                Some(&nurse),
                &batch_request(vaccine_id, "IPV-001", 5, 180),
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let batch: InventoryBatch = read_json(response).await;
        assert_eq!(batch.status, InventoryStatus::Available);

        let decrease = format!("/api/v1/inventory/{}/decrease", batch.id);
        let response = app
            .clone()
            .oneshot(json_request(Method::PUT, &decrease, Some(&nurse), &AdjustQuantityRequest { amount: 5 }))
            .await?;
        let depleted: InventoryBatch = read_json(response).await;
        assert_eq!(depleted.quantity, 0);
        assert_eq!(depleted.status, InventoryStatus::Depleted);

        // Nothing left to take
        let response = app
            .clone()
            .oneshot(json_request(Method::PUT, &decrease, Some(&nurse), &AdjustQuantityRequest { amount: 1 }))
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.error, "BUSINESS_RULE_VIOLATION");

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/v1/inventory/{}/increase", batch.id),
                Some(&nurse),
                &AdjustQuantityRequest { amount: 3 },
            ))
            .await?;
        let restocked: InventoryBatch = read_json(response).await;
        assert_eq!(restocked.quantity, 3);
        assert_eq!(restocked.status, InventoryStatus::Available);

        let response = app
            .oneshot(request(
                Method::GET,
                &format!("/api/v1/inventory/vaccine/{}/total", vaccine_id),
                Some(&nurse),
            ))
            .await?;
        let total: StockTotalResponse = read_json(response).await;
        assert_eq!(total.total_available, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_quantity_is_staff_only() -> TestResult {
        let (state, app) = test_app().await;
        let parent = token_for(&state, "parent1", Role::Parent).await;
        let vaccine_id = seed_vaccine(&state).await?;
        let batch = state
            .inventory_service
            .create_batch(batch_request(vaccine_id, "IPV-002", 10, 90))
            .await?;

        let response = app
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/v1/inventory/{}/quantity", batch.id),
                Some(&parent),
                &SetQuantityRequest { quantity: 0 },
            ))
            .await?;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn test_expiring_and_low_stock_views() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        let vaccine_id = seed_vaccine(&state).await?;
        state
            .inventory_service
            .create_batch(batch_request(vaccine_id, "IPV-SOON", 50, 7))
            .await?;
        state
            .inventory_service
            .create_batch(batch_request(vaccine_id, "IPV-LOW", 2, 365))
            .await?;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/inventory/expiring?days=14", Some(&nurse)))
            .await?;
        let expiring: InventoryListResponse = read_json(response).await;
        assert_eq!(expiring.batches.len(), 1);
        assert_eq!(expiring.batches[0].batch_number, "IPV-SOON");

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/inventory/low-stock", Some(&nurse)))
            .await?;
        let low: InventoryListResponse = read_json(response).await;
        assert_eq!(low.batches.len(), 1);
        assert_eq!(low.batches[0].batch_number, "IPV-LOW");

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/inventory/status/available", Some(&nurse)))
            .await?;
        let available: InventoryListResponse = read_json(response).await;
        assert_eq!(available.batches.len(), 2);

        let response = app
            .oneshot(request(Method::GET, "/api/v1/inventory/status/LOST", Some(&nurse)))
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
