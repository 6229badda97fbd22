use crate::transport::http::handlers::{accounts, certificates, health, verify};
use crate::transport::http::types::{ApiResponse, AppState, LoginRequest, RegisterRequest};
use axum::routing::{get, post};
use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        accounts::register_handler,
        accounts::login_handler,
        accounts::me_handler,
        certificates::issue_handler,
        certificates::list_handler,
        certificates::stats_handler,
        certificates::download_handler,
        verify::verify_handler
    ),
    components(schemas(
        ApiResponse,
        RegisterRequest,
        LoginRequest,
        crate::domain::certificate::Role,
        crate::domain::certificate::CertificateSummary,
        crate::domain::certificate::LedgerProof,
        crate::domain::verify::VerificationReport,
        certificates::IssuanceReceiptSchema
    )),
    modifiers(&SecurityAddon)
)]
#[allow(dead_code)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/api/register", post(accounts::register_handler))
        .route("/api/login", post(accounts::login_handler))
        .route("/api/me", get(accounts::me_handler))
        .route("/api/certificates", post(certificates::issue_handler).get(certificates::list_handler))
        .route("/api/stats", get(certificates::stats_handler))
        .route("/api/verify", get(verify::verify_handler))
        .route("/uploads/:filename", get(certificates::download_handler))
        .with_state(app_state)
}
