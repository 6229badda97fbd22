use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::crypto::hashing;
use crate::domain::certificate::CertificateSummary;
use crate::domain::verify::merge_evidence;
use crate::transport::http::types::{error_response, ApiResponse, AppState, VerifyParams};

/// Public verification endpoint: merges ledger evidence and store metadata
/// for a content hash. "Found in neither" is a 200 with a negative report.
#[utoipa::path(
    get,
    path = "/api/verify",
    params(("hash" = String, Query, description = "Content hash (0x prefix optional)")),
    responses(
        (status = 200, description = "Verification report", body = ApiResponse),
        (status = 400, description = "Missing or malformed hash", body = ApiResponse),
        (status = 502, description = "Ledger lookup failed", body = ApiResponse)
    )
)]
pub async fn verify_handler(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    let raw = match params.hash.as_deref().map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => return error_response(StatusCode::BAD_REQUEST, "hash is required").into_response(),
    };

    let digest = match hashing::parse_content_hash(raw) {
        Ok(d) => d,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("invalid hash: {}", e)).into_response(),
    };
    let canonical = hashing::canonical_hex(digest);

    // The two sides are consulted independently; neither failure mode of the
    // ledger is allowed to mask store evidence.
    let ledger = match state.ledger.lookup(digest).await {
        Ok(l) => l,
        Err(e) => {
            return error_response(StatusCode::BAD_GATEWAY, format!("ledger lookup failed: {}", e))
                .into_response()
        }
    };

    let certificate: Option<CertificateSummary> = match state.store.find_by_hash(&canonical).await {
        Ok(row) => row.as_ref().map(CertificateSummary::from),
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let report = merge_evidence(ledger, certificate);
    let mut data = serde_json::to_value(&report).unwrap_or_default();
    if let Some(obj) = data.as_object_mut() {
        obj.insert("hash".to_string(), serde_json::json!(canonical));
    }

    (StatusCode::OK, Json(ApiResponse::ok(data))).into_response()
}
