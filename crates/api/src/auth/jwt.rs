//! Access and refresh tokens.
//!
//! Access tokens are HS256 JWTs carrying [`AccessClaims`]. Refresh tokens
//! are opaque UUIDs handed to the client once; the database keeps only their
//! SHA-256 hex digest.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use keystone_core::types::DbId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::TokenConfig;

/// Seconds of clock skew tolerated when checking `exp`.
const LEEWAY_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id.
    pub sub: DbId,
    /// Role at issue time. Authorization re-reads the current role.
    pub role_id: DbId,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// A signed access token and its lifetime in seconds.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

pub fn issue_access_token(
    user_id: DbId,
    role_id: DbId,
    config: &TokenConfig,
) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
    let iat = chrono::Utc::now().timestamp();
    let expires_in = config.access_ttl_secs();
    let claims = AccessClaims {
        sub: user_id,
        role_id,
        iat,
        exp: iat + expires_in,
        jti: Uuid::new_v4().to_string(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;
    Ok(IssuedToken { token, expires_in })
}

/// Verify signature and expiry, returning the claims.
pub fn decode_access_token(
    token: &str,
    config: &TokenConfig,
) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = LEEWAY_SECS;
    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

/// A freshly minted refresh token.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    /// Returned to the client, never stored.
    pub plaintext: String,
    pub hash: String,
}

impl RefreshToken {
    pub fn generate() -> Self {
        let plaintext = Uuid::new_v4().to_string();
        let hash = hash_refresh_token(&plaintext);
        Self { plaintext, hash }
    }
}

pub fn hash_refresh_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
