//! Verification merge: combines ledger-side and store-side evidence for a
//! content hash into a single reported outcome.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::certificate::CertificateSummary;
use crate::domain::ledger::LedgerLookup;

/// The merged verification outcome. Each side is populated independently: a
/// hash can be on-chain with no local metadata, or local-only when the ledger
/// was unavailable at issuance. "Found in neither" is a valid negative result.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationReport {
    /// Whether a bound ledger was actually queried for this call. When false,
    /// `on_ledger = false` means "unknown", not "absent".
    pub ledger_consulted: bool,
    pub on_ledger: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateSummary>,
}

pub fn merge_evidence(
    ledger: LedgerLookup,
    certificate: Option<CertificateSummary>,
) -> VerificationReport {
    VerificationReport {
        ledger_consulted: ledger.consulted,
        on_ledger: ledger.exists,
        recorder: ledger.recorder,
        recorded_at: ledger.recorded_at,
        certificate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summary() -> CertificateSummary {
        CertificateSummary {
            student_name: "Ada Lovelace".to_string(),
            student_email: "ada@example.org".to_string(),
            course_name: "Analytical Engines".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            issuer_id: 1,
        }
    }

    #[test]
    fn unknown_hash_is_a_negative_outcome_not_an_error() {
        let ledger = LedgerLookup { consulted: true, exists: false, recorder: None, recorded_at: None };
        let report = merge_evidence(ledger, None);
        assert!(report.ledger_consulted);
        assert!(!report.on_ledger);
        assert!(report.certificate.is_none());
    }

    #[test]
    fn ledger_only_evidence_survives_missing_local_metadata() {
        let ledger = LedgerLookup {
            consulted: true,
            exists: true,
            recorder: Some("6fSQZwqdsr8zVSbE8DTo4tsHDW4af3iZyB5KGzEGqyW8".to_string()),
            recorded_at: Some(1_717_200_000),
        };
        let report = merge_evidence(ledger, None);
        assert!(report.on_ledger);
        assert!(report.recorder.is_some());
        assert!(report.certificate.is_none());
    }

    #[test]
    fn store_only_evidence_reports_unconsulted_ledger_distinctly() {
        let ledger = LedgerLookup { consulted: false, exists: false, recorder: None, recorded_at: None };
        let report = merge_evidence(ledger, Some(summary()));
        assert!(!report.ledger_consulted);
        assert!(!report.on_ledger);
        assert_eq!(report.certificate.unwrap().student_email, "ada@example.org");
    }
}
