use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::app::issuance::ActingAccount;
use crate::transport::http::auth;
use crate::transport::http::types::{error_response, ApiResponse, AppState, LoginRequest, RegisterRequest};

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = ApiResponse),
        (status = 400, description = "Invalid input", body = ApiResponse),
        (status = 409, description = "Email already registered", body = ApiResponse)
    )
)]
pub async fn register_handler(
    State(state): State<AppState>,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid JSON body: {} (expected: {{\"email\", \"password\", \"role\"}})", e),
            )
                .into_response();
        }
    };

    let email = request.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return error_response(StatusCode::BAD_REQUEST, "a valid email is required").into_response();
    }
    if request.password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "password is required").into_response();
    }

    let password_hash = match auth::hash_password(&request.password) {
        Ok(h) => h,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    match state.store.create_account(&email, &password_hash, request.role).await {
        Ok(Some(id)) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "id": id, "message": "registered" }))),
        )
            .into_response(),
        Ok(None) => error_response(StatusCode::CONFLICT, "email already registered").into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued", body = ApiResponse),
        (status = 401, description = "Invalid credentials", body = ApiResponse)
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid JSON body: {} (expected: {{\"email\", \"password\"}})", e),
            )
                .into_response();
        }
    };

    let account = match state.store.find_account_by_email(&request.email).await {
        Ok(Some(a)) => a,
        Ok(None) => return error_response(StatusCode::UNAUTHORIZED, "invalid credentials").into_response(),
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    if !auth::verify_password(&request.password, &account.password_hash) {
        return error_response(StatusCode::UNAUTHORIZED, "invalid credentials").into_response();
    }

    match auth::issue_token(&account) {
        Ok(token) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({ "access_token": token }))),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/me",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Current identity", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse)
    )
)]
pub async fn me_handler(identity: ActingAccount) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse::ok(serde_json::json!({
            "id": identity.account_id,
            "role": identity.role.as_str(),
            "email": identity.email,
        }))),
    )
}
