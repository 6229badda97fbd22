//! Durable relational storage for accounts and certificates.
//!
//! The store is deliberately independent of ledger availability: a certificate
//! row is valid with or without its ledger proof columns. Tables are created
//! on construction so a fresh database works without a separate migration step.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::domain::certificate::{Account, CertificateRow, NewCertificate, Role};
use crate::infra::config;

pub struct CertificateStore {
    pool: PgPool,
}

impl CertificateStore {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connects to the database and ensures the schema exists.
    pub async fn new() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        let database_url = config::database_url();

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: PgPool) -> anyhow::Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS accounts (
                id BIGSERIAL PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS certificates (
                id BIGSERIAL PRIMARY KEY,
                student_name TEXT NOT NULL,
                student_email TEXT NOT NULL,
                course_name TEXT NOT NULL,
                issue_date DATE NOT NULL,
                file_name TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                ledger_tx TEXT,
                ledger_address TEXT,
                issuer_id BIGINT NOT NULL REFERENCES accounts(id),
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_certificates_content_hash ON certificates (content_hash)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// Creates an account with a normalized-lowercase email. Returns None when
    /// the email is already taken.
    pub async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> anyhow::Result<Option<i64>> {
        let email = email.trim().to_lowercase();

        let row = sqlx::query(
            "INSERT INTO accounts (email, password_hash, role) VALUES ($1, $2, $3)
             ON CONFLICT (email) DO NOTHING
             RETURNING id",
        )
        .bind(&email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_get("id")?)),
            None => Ok(None),
        }
    }

    pub async fn find_account_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let email = email.trim().to_lowercase();
        let row = sqlx::query("SELECT id, email, password_hash, role FROM accounts WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::account_from_row(&r)).transpose()
    }

    fn account_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Account> {
        let role_str: String = row.try_get("role")?;
        let role = Role::parse(&role_str)
            .ok_or_else(|| anyhow::anyhow!("account has unknown role '{}'", role_str))?;
        Ok(Account {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role,
        })
    }

    /// Persists a certificate row. The ledger columns are written together:
    /// both present when a proof was obtained, both NULL otherwise.
    pub async fn insert_certificate(&self, cert: &NewCertificate) -> anyhow::Result<i64> {
        let (ledger_tx, ledger_address) = match &cert.ledger {
            Some(proof) => (Some(proof.tx_ref.as_str()), Some(proof.contract_address.as_str())),
            None => (None, None),
        };

        let row = sqlx::query(
            "INSERT INTO certificates
                (student_name, student_email, course_name, issue_date, file_name,
                 content_hash, ledger_tx, ledger_address, issuer_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(&cert.student_name)
        .bind(&cert.student_email)
        .bind(&cert.course_name)
        .bind(cert.issue_date)
        .bind(&cert.file_name)
        .bind(&cert.content_hash)
        .bind(ledger_tx)
        .bind(ledger_address)
        .bind(cert.issuer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    pub async fn find_by_hash(&self, canonical_hash: &str) -> anyhow::Result<Option<CertificateRow>> {
        let row = sqlx::query(
            "SELECT id, student_name, student_email, course_name, issue_date, file_name,
                    content_hash, ledger_tx, ledger_address, issuer_id, created_at
             FROM certificates WHERE content_hash = $1
             ORDER BY created_at ASC LIMIT 1",
        )
        .bind(canonical_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::certificate_from_row(&r)).transpose()
    }

    pub async fn find_by_file_name(&self, file_name: &str) -> anyhow::Result<Option<CertificateRow>> {
        let row = sqlx::query(
            "SELECT id, student_name, student_email, course_name, issue_date, file_name,
                    content_hash, ledger_tx, ledger_address, issuer_id, created_at
             FROM certificates WHERE file_name = $1 LIMIT 1",
        )
        .bind(file_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::certificate_from_row(&r)).transpose()
    }

    /// Certificates issued by a given issuer account, newest first.
    pub async fn list_for_issuer(&self, issuer_id: i64) -> anyhow::Result<Vec<CertificateRow>> {
        let rows = sqlx::query(
            "SELECT id, student_name, student_email, course_name, issue_date, file_name,
                    content_hash, ledger_tx, ledger_address, issuer_id, created_at
             FROM certificates WHERE issuer_id = $1 ORDER BY created_at DESC",
        )
        .bind(issuer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::certificate_from_row).collect()
    }

    /// Certificates whose student email matches a student account, newest first.
    pub async fn list_for_student(&self, email: &str) -> anyhow::Result<Vec<CertificateRow>> {
        let rows = sqlx::query(
            "SELECT id, student_name, student_email, course_name, issue_date, file_name,
                    content_hash, ledger_tx, ledger_address, issuer_id, created_at
             FROM certificates WHERE student_email = $1 ORDER BY created_at DESC",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::certificate_from_row).collect()
    }

    pub async fn counts(&self) -> anyhow::Result<(i64, i64)> {
        let accounts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        let certificates: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM certificates")
            .fetch_one(&self.pool)
            .await?;
        Ok((accounts, certificates))
    }

    fn certificate_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<CertificateRow> {
        Ok(CertificateRow {
            id: row.try_get("id")?,
            student_name: row.try_get("student_name")?,
            student_email: row.try_get("student_email")?,
            course_name: row.try_get("course_name")?,
            issue_date: row.try_get("issue_date")?,
            file_name: row.try_get("file_name")?,
            content_hash: row.try_get("content_hash")?,
            ledger_tx: row.try_get("ledger_tx")?,
            ledger_address: row.try_get("ledger_address")?,
            issuer_id: row.try_get("issuer_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
