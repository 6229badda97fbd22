use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::app::certificate_store::CertificateStore;
use crate::app::issuance::IssuanceService;
use crate::domain::certificate::Role;
use crate::domain::ledger::LedgerGateway;
use crate::storage::documents::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CertificateStore>,
    pub documents: Arc<DocumentStore>,
    pub ledger: Arc<LedgerGateway>,
    pub issuance: Arc<IssuanceService>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: JsonValue) -> Self {
        ApiResponse { success: true, data: Some(data), error: None }
    }

    pub fn err(message: impl Into<String>) -> Self {
        ApiResponse { success: false, data: None, error: Some(message.into()) }
    }
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiResponse>) {
    (status, Json(ApiResponse::err(message)))
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct VerifyParams {
    /// Content hash to verify; `0x` prefix optional, case-insensitive.
    pub hash: Option<String>,
}
