//! Bearer-token authentication: HS256 tokens carrying identity, role and
//! email, valid for 12 hours, plus bcrypt credential hashing.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::app::issuance::ActingAccount;
use crate::domain::certificate::{Account, Role};
use crate::infra::config;
use crate::transport::http::types::ApiResponse;

const TOKEN_VALIDITY_HOURS: i64 = 12;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id, stringified.
    pub sub: String,
    pub role: String,
    pub email: String,
    pub exp: usize,
}

pub fn issue_token(account: &Account) -> anyhow::Result<String> {
    let exp = chrono::Utc::now() + chrono::Duration::hours(TOKEN_VALIDITY_HOURS);
    let claims = Claims {
        sub: account.id.to_string(),
        role: account.role.as_str().to_string(),
        email: account.email.clone(),
        exp: exp.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config::jwt_secret().as_bytes()),
    )?;
    Ok(token)
}

pub fn decode_token(token: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config::jwt_secret().as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

fn unauthorized(message: &str) -> (StatusCode, Json<ApiResponse>) {
    (StatusCode::UNAUTHORIZED, Json(ApiResponse::err(message)))
}

/// Extractor turning the `Authorization: Bearer ...` header into the acting
/// account. Authorization failures are rejected here, before any handler or
/// orchestrator code runs.
#[async_trait]
impl<S> FromRequestParts<S> for ActingAccount
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("missing bearer token"))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or_else(|| unauthorized("malformed authorization header"))?;

        let claims = decode_token(token).map_err(|_| unauthorized("invalid or expired token"))?;

        let account_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| unauthorized("invalid token subject"))?;
        let role = Role::parse(&claims.role).ok_or_else(|| unauthorized("invalid token role"))?;

        Ok(ActingAccount { account_id, role, email: claims.email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            id: 7,
            email: "registrar@uni.edu".to_string(),
            password_hash: String::new(),
            role: Role::Issuer,
        }
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let token = issue_token(&account()).unwrap();
        let claims = decode_token(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, "issuer");
        assert_eq!(claims.email, "registrar@uni.edu");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let mut token = issue_token(&account()).unwrap();
        token.push('x');
        assert!(decode_token(&token).is_err());
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }
}
