// src/bin/api_server.rs

use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use cert_ledger::infra::config;
use cert_ledger::transport;
use cert_ledger::CertificateStore;
use cert_ledger::DocumentStore;
use cert_ledger::IssuanceService;
use cert_ledger::LedgerGateway;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // --- Ledger Gateway Initialization ---
    // Constructed once per process; the capability check happens here and the
    // resolved chain state is shared by every request handler.
    println!("> Initializing LedgerGateway...");
    let ledger = Arc::new(LedgerGateway::from_env());
    if ledger.is_configured() {
        println!("> LedgerGateway configured; binding is resolved lazily on first use.");
    } else {
        println!("> LedgerGateway running in offline mode: certificates will be issued without ledger proofs.");
    }

    // --- Store Initialization ---
    println!("> Initializing CertificateStore...");
    let store = Arc::new(CertificateStore::new().await?);
    println!("> CertificateStore initialized successfully.");

    let upload_dir = config::upload_dir();
    println!("> Document storage area: {:?}", upload_dir);
    let documents = Arc::new(DocumentStore::new(upload_dir)?);

    let issuance = Arc::new(IssuanceService::new(store.clone(), documents.clone(), ledger.clone()));

    let app_state = transport::http::AppState {
        store,
        documents,
        ledger,
        issuance,
    };

    // --- API Server Initialization ---
    println!("> Starting API server...");
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(axum::extract::DefaultBodyLimit::max(config::max_upload_bytes()))
        .layer(cors);

    let addr = config::listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("> API server listening on http://{}", addr);
    println!("> Swagger UI available at http://{}/swagger-ui", addr);
    println!("> Press Ctrl+C to shut down");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n> Shutdown signal received (Ctrl+C). No in-flight ledger work is cancelled; submitted transactions confirm on their own.");
        }
    }

    Ok(())
}
