//! Request-scoped client handle for the downstream backend-as-a-service.
//!
//! A handle is created per request. It always presents the project key as
//! `apikey`; the bearer credential is the service key until a caller session is
//! bound to the handle (see `session`), after which it is the caller's token.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::repos::error::{RepoError, RepoResult};

use super::session::Session;

/// Whose permissions a downstream call runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Service,
    Caller,
}

pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Arc<str>,
    pub(super) session: Option<Session>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .field("authority", &self.authority())
            .finish()
    }
}

impl RestClient {
    /// `http` is the process-wide connection pool; it carries no identity.
    pub fn new(http: reqwest::Client, base_url: Url, api_key: Arc<str>) -> Self {
        Self {
            http,
            base_url,
            api_key,
            session: None,
        }
    }

    pub fn authority(&self) -> Authority {
        match self.session {
            Some(_) => Authority::Caller,
            None => Authority::Service,
        }
    }

    pub(super) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(super) fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Absolute URL for the given path segments under the base URL.
    /// Each segment is percent-encoded on its own.
    pub fn endpoint<'a, I>(&self, segments: I) -> RepoResult<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RepoError::Decode(format!("downstream url cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn bearer(&self) -> &str {
        match &self.session {
            Some(session) => session.access_token.expose(),
            None => &self.api_key,
        }
    }

    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", self.api_key())
            .bearer_auth(self.bearer())
    }

    /// Send and turn non-2xx responses into `RepoError`.
    ///
    /// A 401 on a caller-bound handle means the caller's token stopped being
    /// accepted. The session cannot refresh, so this is `SessionExpired`.
    pub async fn send(&self, req: RequestBuilder) -> RepoResult<Response> {
        let res = req.send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        if status == StatusCode::UNAUTHORIZED
            && let Some(session) = &self.session
        {
            if let Err(e) = session.refresh() {
                tracing::warn!(
                    token_fp = %session.access_token.fingerprint(),
                    error = %e,
                    "downstream rejected bound session"
                );
            }
            return Err(RepoError::SessionExpired);
        }

        let body = res.text().await.unwrap_or_default();
        Err(RepoError::status(status, body))
    }
}
