//! The issuance orchestrator: validate -> persist document -> hash ->
//! ledger record -> persist metadata, classifying partial failure.
//!
//! Issuance succeeds even when the ledger is unavailable; the certificate is
//! then a degraded-but-legitimate record with both ledger columns absent.
//! Ledger rejection (e.g. duplicate hash) aborts the issuance, and a store
//! failure after a confirmed ledger write is reported as its own condition
//! because a blind retry would risk a duplicate ledger submission.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::app::certificate_store::CertificateStore;
use crate::crypto::hashing;
use crate::domain::certificate::{LedgerProof, NewCertificate, Role};
use crate::domain::ledger::{LedgerGateway, RecordOutcome};
use crate::storage::documents::DocumentStore;

/// The acting account, as decoded from the bearer token at the boundary.
#[derive(Debug, Clone)]
pub struct ActingAccount {
    pub account_id: i64,
    pub role: Role,
    pub email: String,
}

/// Client-supplied certificate metadata, prior to validation.
#[derive(Debug, Clone, Default)]
pub struct IssuanceRequest {
    pub student_name: String,
    pub student_email: String,
    pub course_name: String,
    pub issue_date: String,
}

/// What the caller gets back from a successful issuance.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssuanceReceipt {
    pub id: i64,
    /// Canonical content hash ("0x" + 64 lowercase hex chars).
    pub hash: String,
    pub tx: Option<String>,
    pub contract: Option<String>,
    pub filename: String,
    pub download_url: String,
}

/// Failure modes of issuance, kept distinct so callers and operators can react
/// correctly to each.
#[derive(Debug)]
pub enum IssuanceError {
    /// Rejected before any side effect.
    Validation(String),
    /// The ledger was reachable but the operation failed (duplicate hash,
    /// rejected transaction). The stored document is left in place.
    Ledger(anyhow::Error),
    /// The hash was recorded on the ledger but the local row could not be
    /// saved. Cannot be silently retried without risking a duplicate write.
    PartiallyRecorded {
        hash: String,
        tx_ref: String,
        contract_address: String,
        source: anyhow::Error,
    },
    /// Local persistence failed before any ledger write succeeded.
    Store(anyhow::Error),
}

impl fmt::Display for IssuanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssuanceError::Validation(msg) => write!(f, "validation failed: {}", msg),
            IssuanceError::Ledger(e) => write!(f, "ledger operation failed: {}", e),
            IssuanceError::PartiallyRecorded { hash, tx_ref, .. } => write!(
                f,
                "certificate {} recorded on ledger (tx {}) but not saved locally",
                hash, tx_ref
            ),
            IssuanceError::Store(e) => write!(f, "store persistence failed: {}", e),
        }
    }
}

impl std::error::Error for IssuanceError {}

/// Metadata after validation: parsed date, possibly-overridden student email.
#[derive(Debug)]
pub struct ValidatedRequest {
    pub student_name: String,
    pub student_email: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
}

/// Validates an issuance request. Runs before any persistence; a rejection
/// here guarantees no file was written and no ledger call was made.
pub fn validate_request(
    meta: &IssuanceRequest,
    original_file_name: &str,
    bytes: &[u8],
    acting: &ActingAccount,
) -> Result<ValidatedRequest, IssuanceError> {
    let student_name = meta.student_name.trim().to_string();
    let course_name = meta.course_name.trim().to_string();
    if student_name.is_empty() {
        return Err(IssuanceError::Validation("student_name is required".to_string()));
    }
    if course_name.is_empty() {
        return Err(IssuanceError::Validation("course_name is required".to_string()));
    }

    // A student can only issue under their own verified identity; the
    // client-supplied email is ignored for student accounts.
    let student_email = match acting.role {
        Role::Student => acting.email.trim().to_lowercase(),
        Role::Issuer => meta.student_email.trim().to_lowercase(),
    };
    if student_email.is_empty() {
        return Err(IssuanceError::Validation("student_email is required".to_string()));
    }

    let date_str = meta.issue_date.trim();
    let issue_date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_str, "%d-%m-%Y"))
        .map_err(|_| {
            IssuanceError::Validation(format!(
                "issue_date '{}' is not a valid date (expected YYYY-MM-DD or DD-MM-YYYY)",
                date_str
            ))
        })?;

    if bytes.is_empty() {
        return Err(IssuanceError::Validation("uploaded file is empty".to_string()));
    }
    let is_pdf = original_file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        return Err(IssuanceError::Validation("only PDF documents are accepted".to_string()));
    }

    Ok(ValidatedRequest { student_name, student_email, course_name, issue_date })
}

/// Maps the gateway's record outcome onto issuance semantics: a confirmed
/// write becomes a proof, unavailability becomes no proof, and a reachable
/// ledger that rejected the operation aborts the issuance.
fn ledger_proof_from_outcome(
    outcome: anyhow::Result<RecordOutcome>,
) -> Result<Option<LedgerProof>, IssuanceError> {
    match outcome {
        Ok(RecordOutcome::Recorded { tx_ref, contract_address }) => {
            Ok(Some(LedgerProof { tx_ref, contract_address }))
        }
        Ok(RecordOutcome::Unavailable) => Ok(None),
        Err(e) => Err(IssuanceError::Ledger(e)),
    }
}

/// Classifies a failed row insert. After a confirmed ledger write the error
/// must carry the on-chain references so the record can be reconciled.
fn classify_insert_failure(
    hash: String,
    ledger_proof: Option<LedgerProof>,
    source: anyhow::Error,
) -> IssuanceError {
    match ledger_proof {
        Some(proof) => IssuanceError::PartiallyRecorded {
            hash,
            tx_ref: proof.tx_ref,
            contract_address: proof.contract_address,
            source,
        },
        None => IssuanceError::Store(source),
    }
}

pub struct IssuanceService {
    store: Arc<CertificateStore>,
    documents: Arc<DocumentStore>,
    ledger: Arc<LedgerGateway>,
}

impl IssuanceService {
    pub fn new(
        store: Arc<CertificateStore>,
        documents: Arc<DocumentStore>,
        ledger: Arc<LedgerGateway>,
    ) -> Self {
        Self { store, documents, ledger }
    }

    pub async fn issue(
        &self,
        meta: IssuanceRequest,
        original_file_name: &str,
        bytes: &[u8],
        acting: &ActingAccount,
    ) -> Result<IssuanceReceipt, IssuanceError> {
        let validated = validate_request(&meta, original_file_name, bytes, acting)?;

        // 1. Persist the raw document under a collision-avoiding name.
        let stored = self
            .documents
            .save(original_file_name, bytes)
            .await
            .map_err(IssuanceError::Store)?;

        // 2. Hash the bytes as stored, not as uploaded.
        let digest = hashing::hash_file(&stored.path).await.map_err(IssuanceError::Store)?;
        let canonical = hashing::canonical_hex(digest);

        // 3. Attempt the ledger write. Unavailability degrades the issuance;
        //    an actual ledger error aborts it (the document stays on disk, a
        //    re-issuance may reuse or ignore it).
        let ledger_proof = ledger_proof_from_outcome(self.ledger.record(digest).await)?;
        match &ledger_proof {
            Some(proof) => {
                println!("> Issuance: hash {} recorded on ledger (tx {})", canonical, proof.tx_ref)
            }
            None => {
                println!("> Issuance: ledger unavailable, issuing {} without a ledger proof", canonical)
            }
        }

        // 4. Persist the certificate row; both ledger fields or neither.
        let new_cert = NewCertificate {
            student_name: validated.student_name,
            student_email: validated.student_email,
            course_name: validated.course_name,
            issue_date: validated.issue_date,
            file_name: stored.file_name.clone(),
            content_hash: canonical.clone(),
            ledger: ledger_proof.clone(),
            issuer_id: acting.account_id,
        };

        let id = match self.store.insert_certificate(&new_cert).await {
            Ok(id) => id,
            // 5. Store failure after a confirmed ledger write is its own
            //    reportable condition.
            Err(e) => return Err(classify_insert_failure(canonical, ledger_proof, e)),
        };

        Ok(IssuanceReceipt {
            id,
            hash: canonical,
            tx: ledger_proof.as_ref().map(|p| p.tx_ref.clone()),
            contract: ledger_proof.as_ref().map(|p| p.contract_address.clone()),
            filename: stored.file_name.clone(),
            download_url: format!("/uploads/{}", stored.file_name),
        })
    }
}
