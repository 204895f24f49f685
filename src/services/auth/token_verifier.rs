use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::api::v1::extractors::{BearerToken, CallerIdentity};

/// Name-identifier claim emitted by some identity platforms in place of `sub`.
pub const NAME_IDENTIFIER_CLAIM: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";

/// Claim names accepted as the subject, in priority order.
pub const SUBJECT_CLAIMS: [&str; 2] = ["sub", NAME_IDENTIFIER_CLAIM];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token expired")]
    Expired,
    #[error("jwt verification failed: {0}")]
    Jwt(jsonwebtoken::errors::Error),
    #[error("no subject claim present")]
    MissingSubject,
    #[error("subject is not a UUID")]
    MalformedSubject,
}

impl AuthError {
    /// The token itself verified, but it does not name a usable owner.
    pub fn is_unusable_identity(&self) -> bool {
        matches!(self, Self::MissingSubject | Self::MalformedSubject)
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Jwt(e),
        }
    }
}

/// Access token claims.
///
/// `iss`/`aud`/`exp` are checked by `jsonwebtoken::Validation`; everything else
/// lands in `other` so the subject lookup can walk `SUBJECT_CLAIMS`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenClaims {
    pub iss: String,
    #[serde(default)]
    pub aud: Value,
    pub exp: u64,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl AccessTokenClaims {
    /// First non-empty string claim from `SUBJECT_CLAIMS`.
    pub fn subject(&self) -> Option<&str> {
        SUBJECT_CLAIMS.iter().find_map(|name| {
            self.other
                .get(*name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
    }
}

/// HS256 verifier for tokens minted by the identity service that shares our secret.
///
/// Key material is not printable via Debug.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(shared_secret: &str, issuer: &str, audience: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(shared_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        // zero skew: a token one second past `exp` is stale
        validation.leeway = 0;
        validation.validate_nbf = true;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Signature + iss/aud/exp, no subject handling.
    pub fn decode(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let data =
            jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Full verification into the per-request identity.
    pub fn verify(&self, token: &str) -> Result<CallerIdentity, AuthError> {
        let claims = self.decode(token)?;

        let subject = claims.subject().ok_or(AuthError::MissingSubject)?;
        let subject_id = Uuid::parse_str(subject).map_err(|_| AuthError::MalformedSubject)?;

        Ok(CallerIdentity::new(subject_id, BearerToken::new(token)))
    }
}
