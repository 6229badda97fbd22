//! Core records owned by the certificate store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role of an account. Issuers issue on behalf of students; students may
/// self-issue but only under their own verified email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Issuer,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Issuer => "issuer",
            Role::Student => "student",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "issuer" => Some(Role::Issuer),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

/// A registered account row.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Proof that a content hash was recorded on the ledger. Both fields come from
/// the same ledger call; carrying them as one value makes the "tx_ref present
/// iff ledger_address present" invariant structural.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LedgerProof {
    pub tx_ref: String,
    pub contract_address: String,
}

/// Input to certificate persistence, assembled by the issuance orchestrator.
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub student_name: String,
    pub student_email: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub file_name: String,
    pub content_hash: String,
    pub ledger: Option<LedgerProof>,
    pub issuer_id: i64,
}

/// A persisted certificate row.
#[derive(Debug, Clone)]
pub struct CertificateRow {
    pub id: i64,
    pub student_name: String,
    pub student_email: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub file_name: String,
    pub content_hash: String,
    pub ledger_tx: Option<String>,
    pub ledger_address: Option<String>,
    pub issuer_id: i64,
    pub created_at: DateTime<Utc>,
}

/// The store-side metadata exposed by verification.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CertificateSummary {
    pub student_name: String,
    pub student_email: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub issuer_id: i64,
}

impl From<&CertificateRow> for CertificateSummary {
    fn from(row: &CertificateRow) -> Self {
        CertificateSummary {
            student_name: row.student_name.clone(),
            student_email: row.student_email.clone(),
            course_name: row.course_name.clone(),
            issue_date: row.issue_date,
            issuer_id: row.issuer_id,
        }
    }
}
