//! Binding a downstream handle to the caller's own credentials.
//!
//! The caller's token is presented to the downstream auth service; once it is
//! accepted, every call on that handle runs with the caller's permissions and the
//! downstream row-level policy applies. This relay never sees a refresh token, so
//! a bound session cannot be refreshed and must not outlive the request.

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::api::v1::extractors::{BearerToken, CallerIdentity};
use crate::repos::error::{RepoError, RepoResult};

use super::client::RestClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("downstream rejected the caller token")]
    Rejected,
    #[error("downstream user does not match the verified subject")]
    SubjectMismatch,
    #[error("handle is already bound to a different caller")]
    AlreadyBound,
    #[error("session refresh is not available on relayed sessions")]
    RefreshUnavailable,
}

/// Caller session held by a bound handle.
#[derive(Clone)]
pub struct Session {
    pub(super) access_token: BearerToken,
    pub(super) subject_id: Uuid,
}

impl Session {
    pub fn subject_id(&self) -> Uuid {
        self.subject_id
    }

    /// Always fails: there is no refresh token to exchange.
    pub fn refresh(&self) -> Result<(), SessionError> {
        Err(SessionError::RefreshUnavailable)
    }
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    id: Uuid,
}

impl RestClient {
    /// Bind this handle to `caller`.
    ///
    /// Idempotent for the same token. A handle already bound to another token is
    /// never rebound.
    pub async fn bind_session(&mut self, caller: &CallerIdentity) -> RepoResult<()> {
        if let Some(existing) = &self.session {
            if existing.access_token == caller.raw_token {
                return Ok(());
            }
            return Err(SessionError::AlreadyBound.into());
        }

        let url = self.endpoint(["auth", "v1", "user"])?;
        let res = self
            .http()
            .get(url)
            .header("apikey", self.api_key())
            .bearer_auth(caller.raw_token.expose())
            .send()
            .await?;

        let status = res.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            tracing::warn!(
                user_id = %caller.subject_id,
                token_fp = %caller.raw_token.fingerprint(),
                %status,
                "downstream refused session bind"
            );
            return Err(SessionError::Rejected.into());
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(RepoError::status(status, body));
        }

        let user = res
            .json::<SessionUser>()
            .await
            .map_err(|e| RepoError::Decode(e.to_string()))?;

        if user.id != caller.subject_id {
            tracing::warn!(
                user_id = %caller.subject_id,
                downstream_user_id = %user.id,
                "downstream session belongs to another user"
            );
            return Err(SessionError::SubjectMismatch.into());
        }

        tracing::debug!(
            user_id = %caller.subject_id,
            token_fp = %caller.raw_token.fingerprint(),
            "downstream session bound"
        );

        self.session = Some(Session {
            access_token: caller.raw_token.clone(),
            subject_id: caller.subject_id,
        });
        Ok(())
    }

    /// The bound session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}
