//! Centralized configuration (environment variables + defaults).

use std::path::PathBuf;

/// Database URL must be provided (no default) for safety.
pub fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set")
}

/// Secret for signing bearer tokens. Falls back to a dev-only value.
pub fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret".to_string())
}

/// Directory for uploaded certificate documents.
pub fn upload_dir() -> PathBuf {
    PathBuf::from(std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()))
}

/// Maximum accepted upload size in bytes (default 20 MiB).
pub fn max_upload_bytes() -> usize {
    std::env::var("MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(20 * 1024 * 1024)
}

/// Solana RPC URL. Absent means the service runs in offline (no-ledger) mode.
pub fn solana_rpc_url() -> Option<String> {
    std::env::var("SOLANA_RPC_URL").ok().filter(|v| !v.is_empty())
}

/// Program id of the deployed certificate registry program.
pub fn solana_program_id() -> Option<String> {
    std::env::var("SOLANA_PROGRAM_ID").ok().filter(|v| !v.is_empty())
}

/// Pre-configured registry account address. When set, the gateway adopts it
/// as-is without a liveness check against it.
pub fn ledger_registry_address() -> Option<String> {
    std::env::var("LEDGER_REGISTRY_ADDRESS").ok().filter(|v| !v.is_empty())
}

/// Whether the gateway may initialize a fresh registry account on-chain when
/// no registry address is configured.
pub fn ledger_allow_init() -> bool {
    std::env::var("LEDGER_ALLOW_INIT").unwrap_or_default() == "true"
}

/// Path to the payer keypair file used for ledger transactions.
pub fn payer_keypair_path() -> String {
    let raw = std::env::var("PAYER_KEYPAIR_PATH")
        .unwrap_or_else(|_| "~/.config/solana/id.json".to_string());
    shellexpand::tilde(&raw).to_string()
}

/// Address the API server binds to.
pub fn listen_addr() -> String {
    std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}
