/*
 * Responsibility
 * - The authenticated identity as handlers see it
 * - The access middleware verifies the bearer token and stores this in request extensions;
 *   handlers only ever receive this type
 *
 * Notes
 * - Token verification lives in services::auth, not here
 * - Created once per request, never persisted, dropped when the request ends
 */
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// The caller's raw bearer token.
///
/// Only the downstream session binder reads it (`expose`). `Debug` prints a
/// fingerprint instead of the token.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 fingerprint for log correlation.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut encoded = URL_SAFE_NO_PAD.encode(digest);
        encoded.truncate(12);
        encoded
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BearerToken")
            .field(&self.fingerprint())
            .finish()
    }
}

/// Verified caller of the current request.
///
/// - `subject_id` is the owner id every record operation is scoped to
/// - `raw_token` is forwarded only when the downstream session is bound to the caller
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub subject_id: Uuid,
    pub raw_token: BearerToken,
}

impl CallerIdentity {
    pub fn new(subject_id: Uuid, raw_token: BearerToken) -> Self {
        Self {
            subject_id,
            raw_token,
        }
    }
}
