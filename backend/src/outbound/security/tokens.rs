//! HS256 session token codec built on `jsonwebtoken`.
//!
//! Claims are a fixed typed structure validated at decode time; the
//! accepted algorithm is pinned to HS256 so a token signed with any other
//! scheme fails verification, and expiry is checked with zero leeway.
//! Every verification failure collapses into the same uniform error.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::domain::ports::{SessionClaims, TokenCodec, TokenError};
use crate::domain::{Role, UserId, Username};

/// Default session lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// HMAC signing secret, wiped from memory on drop.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wrap raw secret bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for SigningSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(..)")
    }
}

/// Wire shape of the signed claims.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Member identifier.
    sub: String,
    /// Username at issue time.
    username: String,
    /// Role label at issue time.
    role: String,
    /// Issued-at, seconds since epoch.
    iat: i64,
    /// Expiry, seconds since epoch.
    exp: i64,
}

/// Symmetric HS256 implementation of the token codec port.
pub struct HmacTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl HmacTokenCodec {
    /// Create a codec over the given secret and token lifetime.
    ///
    /// Lifetimes beyond chrono's range fall back to the default TTL.
    pub fn new(secret: &SigningSecret, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| {
            chrono::Duration::from_std(DEFAULT_TOKEN_TTL).unwrap_or(chrono::Duration::MAX)
        });
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // A token expired by one second must already be rejected.
        validation.leeway = 0;
        validation
    }
}

impl TokenCodec for HmacTokenCodec {
    fn issue(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        let now = Utc::now();
        let wire = Claims {
            sub: claims.user_id.to_string(),
            username: claims.username.to_string(),
            role: claims.role.as_str().to_owned(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &wire, &self.encoding)
            .map_err(|err| TokenError::issue(err.to_string()))
    }

    fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &Self::validation())
            .map_err(|_| TokenError::Invalid)?;

        let user_id = UserId::parse(&data.claims.sub).map_err(|_| TokenError::Invalid)?;
        let username = Username::new(data.claims.username).map_err(|_| TokenError::Invalid)?;
        let role = Role::parse(&data.claims.role).map_err(|_| TokenError::Invalid)?;

        Ok(SessionClaims {
            user_id,
            username,
            role,
        })
    }
}
