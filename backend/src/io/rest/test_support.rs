//! Helpers for driving the full router in handler tests.

use axum::{
    body::Body,
    http::{header, request::Builder, Method, Request, Response},
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use shared::{CreateUserRequest, Role};

use crate::config::AuthConfig;
use crate::domain::test_support::setup_db;
use crate::{create_router, AppState};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub async fn test_app() -> (AppState, Router) {
    let state = AppState::new(setup_db().await, AuthConfig::for_tests());
    let app = create_router(state.clone(), "http://localhost:8080").expect("Failed to build router");
    (state, app)
}

/// Create an account with `role` and return a bearer token for it
pub async fn token_for(state: &AppState, username: &str, role: Role) -> String {
    let user = state
        .user_service
        .create_user(CreateUserRequest {
            username: username.to_string(),
            email: format!("{}@clinic.test", username),
            password: "test password".to_string(),
            full_name: format!("{} Example", username),
            role,
        })
        .await
        .expect("Failed to create test user");

    state
        .auth_service
        .issue_token(&user)
        .expect("Failed to issue test token")
        .token
}

/// Id of an account created with `token_for`
pub async fn user_id(state: &AppState, username: &str) -> i64 {
    state
        .user_service
        .list_users()
        .await
        .expect("Failed to list users")
        .into_iter()
        .find(|u| u.username == username)
        .map(|u| u.id)
        .expect("No such test user")
}

pub fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    builder(method, uri, token)
        .body(Body::empty())
        .expect("Failed to build request")
}

pub fn json_request<T: Serialize>(method: Method, uri: &str, token: Option<&str>, body: &T) -> Request<Body> {
    builder(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("Failed to encode body")))
        .expect("Failed to build request")
}

fn builder(method: Method, uri: &str, token: Option<&str>) -> Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
        None => builder,
    }
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&body).expect("Body is not the expected JSON")
}
