pub mod app;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::certificate_store::CertificateStore;
pub use app::issuance::{ActingAccount, IssuanceError, IssuanceReceipt, IssuanceRequest, IssuanceService};
pub use crypto::hashing::{canonical_hex, hash_bytes, hash_file, parse_content_hash};
pub use domain::ledger::{LedgerGateway, LedgerLookup, RecordOutcome};
pub use domain::verify::{merge_evidence, VerificationReport};
pub use storage::documents::DocumentStore;
