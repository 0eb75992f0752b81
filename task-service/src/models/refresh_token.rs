use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Bytes of entropy in a refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// A freshly minted opaque refresh token.
///
/// Only `token_hash` and `expires_utc` are persisted; `token` goes to the
/// client once and is never stored.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub token_hash: String,
    pub expires_utc: DateTime<Utc>,
}

impl IssuedRefreshToken {
    /// Generate a new random refresh token valid for `expires_in_days`.
    pub fn generate(expires_in_days: i64) -> Self {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);
        let token_hash = Self::hash_token(&token);

        Self {
            token,
            token_hash,
            expires_utc: Utc::now() + Duration::days(expires_in_days),
        }
    }

    /// Hash a token using SHA-256
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}
