use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value as JsonValue;

use crate::app::issuance::{ActingAccount, IssuanceError, IssuanceRequest};
use crate::domain::certificate::{CertificateRow, Role};
use crate::transport::http::types::{error_response, ApiResponse, AppState};

/// Issue a certificate from a multipart form: `student_name`, `student_email`,
/// `course_name`, `issue_date` and a `file` part (PDF).
#[utoipa::path(
    post,
    path = "/api/certificates",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Certificate issued (ledger proof may be absent in degraded mode)", body = IssuanceReceiptSchema),
        (status = 400, description = "Validation failed", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse),
        (status = 500, description = "Persistence failed (body carries ledger refs when partially recorded)", body = ApiResponse),
        (status = 502, description = "Ledger rejected the operation", body = ApiResponse)
    )
)]
pub async fn issue_handler(
    State(state): State<AppState>,
    identity: ActingAccount,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut meta = IssuanceRequest::default();
    let mut file_name: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, format!("invalid multipart body: {}", e))
                    .into_response()
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "student_name" => meta.student_name = field.text().await.unwrap_or_default(),
            "student_email" => meta.student_email = field.text().await.unwrap_or_default(),
            "course_name" => meta.course_name = field.text().await.unwrap_or_default(),
            "issue_date" => meta.issue_date = field.text().await.unwrap_or_default(),
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                match field.bytes().await {
                    Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                    Err(e) => {
                        return error_response(StatusCode::BAD_REQUEST, format!("failed to read file: {}", e))
                            .into_response()
                    }
                }
            }
            _ => {}
        }
    }

    let (file_name, file_bytes) = match (file_name, file_bytes) {
        (Some(n), Some(b)) => (n, b),
        _ => return error_response(StatusCode::BAD_REQUEST, "file is required").into_response(),
    };

    match state.issuance.issue(meta, &file_name, &file_bytes, &identity).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({
                "id": receipt.id,
                "hash": receipt.hash,
                "tx": receipt.tx,
                "contract": receipt.contract,
                "filename": receipt.filename,
                "download_url": receipt.download_url,
            }))),
        )
            .into_response(),
        Err(IssuanceError::Validation(msg)) => error_response(StatusCode::BAD_REQUEST, msg).into_response(),
        Err(IssuanceError::Ledger(e)) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse {
                success: false,
                data: Some(serde_json::json!({ "code": "LEDGER_REJECTED" })),
                error: Some(format!("ledger operation failed: {}", e)),
            }),
        )
            .into_response(),
        Err(IssuanceError::PartiallyRecorded { hash, tx_ref, contract_address, source }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse {
                success: false,
                data: Some(serde_json::json!({
                    "code": "PARTIALLY_RECORDED",
                    "hash": hash,
                    "tx": tx_ref,
                    "contract": contract_address,
                })),
                error: Some(format!("recorded on ledger but not saved locally: {}", source)),
            }),
        )
            .into_response(),
        Err(IssuanceError::Store(e)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn certificate_json(row: &CertificateRow) -> JsonValue {
    serde_json::json!({
        "id": row.id,
        "student_name": row.student_name,
        "student_email": row.student_email,
        "course_name": row.course_name,
        "issue_date": row.issue_date.to_string(),
        "content_hash": row.content_hash,
        "ledger_tx": row.ledger_tx,
        "ledger_address": row.ledger_address,
        "filename": row.file_name,
        "download_url": format!("/uploads/{}", row.file_name),
    })
}

/// Certificates visible to the caller: issued-by-me for issuers, addressed-to-me
/// for students.
#[utoipa::path(
    get,
    path = "/api/certificates",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Certificates for the caller, newest first", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse)
    )
)]
pub async fn list_handler(State(state): State<AppState>, identity: ActingAccount) -> impl IntoResponse {
    let rows = match identity.role {
        Role::Issuer => state.store.list_for_issuer(identity.account_id).await,
        Role::Student => state.store.list_for_student(&identity.email).await,
    };

    match rows {
        Ok(rows) => {
            let items: Vec<JsonValue> = rows.iter().map(certificate_json).collect();
            (StatusCode::OK, Json(ApiResponse::ok(JsonValue::Array(items)))).into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/stats",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Account and certificate counts", body = ApiResponse),
        (status = 403, description = "Caller is not an issuer", body = ApiResponse)
    )
)]
pub async fn stats_handler(State(state): State<AppState>, identity: ActingAccount) -> impl IntoResponse {
    if identity.role != Role::Issuer {
        return error_response(StatusCode::FORBIDDEN, "forbidden").into_response();
    }
    match state.store.counts().await {
        Ok((accounts, certificates)) => (
            StatusCode::OK,
            Json(ApiResponse::ok(serde_json::json!({
                "accounts": accounts,
                "certificates": certificates,
            }))),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Download a stored document. Only the issuing issuer or the matching student
/// may fetch it.
#[utoipa::path(
    get,
    path = "/uploads/{filename}",
    security(("bearer_token" = [])),
    params(("filename" = String, Path, description = "Stored document name")),
    responses(
        (status = 200, description = "Document bytes", content_type = "application/pdf"),
        (status = 403, description = "Caller is neither the issuer nor the student", body = ApiResponse),
        (status = 404, description = "No such document", body = ApiResponse)
    )
)]
pub async fn download_handler(
    State(state): State<AppState>,
    identity: ActingAccount,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    let cert = match state.store.find_by_file_name(&filename).await {
        Ok(Some(c)) => c,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "not found").into_response(),
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let allowed = match identity.role {
        Role::Issuer => cert.issuer_id == identity.account_id,
        Role::Student => cert.student_email == identity.email,
    };
    if !allowed {
        return error_response(StatusCode::FORBIDDEN, "forbidden").into_response();
    }

    let path = match state.documents.path_for(&cert.file_name) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", cert.file_name),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "document missing from storage").into_response(),
    }
}

// utoipa needs a named schema for the receipt; the handler itself responds
// with the ApiResponse envelope.
#[allow(dead_code)]
#[derive(utoipa::ToSchema)]
pub struct IssuanceReceiptSchema {
    pub id: i64,
    pub hash: String,
    pub tx: Option<String>,
    pub contract: Option<String>,
    pub filename: String,
    pub download_url: String,
}
