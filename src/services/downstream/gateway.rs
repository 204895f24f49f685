//! Opens the request-scoped downstream handle for a verified caller.
//!
//! The gateway is the only place the deployment's `AuthzStrategy` is consulted,
//! so one process never mixes service-key and impersonated calls.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::api::v1::extractors::CallerIdentity;
use crate::config::{AuthzStrategy, Config};
use crate::repos::error::RepoResult;
use crate::repos::file_repo::{FileStore, StorageFileStore};
use crate::repos::job_repo::{JobRepo, PostgrestJobRepo};

use super::client::RestClient;

/// Repositories bound to one caller for one request. Dropped with the request.
pub struct DownstreamHandle {
    pub jobs: Box<dyn JobRepo>,
    pub files: Box<dyn FileStore>,
}

#[async_trait]
pub trait DownstreamGateway: Send + Sync {
    async fn open(&self, caller: &CallerIdentity) -> RepoResult<DownstreamHandle>;
}

pub struct RestGateway {
    http: reqwest::Client,
    base_url: Url,
    service_key: Arc<str>,
    strategy: AuthzStrategy,
}

impl std::fmt::Debug for RestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestGateway")
            .field("base_url", &self.base_url.as_str())
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl RestGateway {
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        service_key: impl Into<Arc<str>>,
        strategy: AuthzStrategy,
    ) -> Self {
        Self {
            http,
            base_url,
            service_key: service_key.into(),
            strategy,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.downstream_timeout)
            .build()?;

        Ok(Self::new(
            http,
            config.downstream_url.clone(),
            config.downstream_service_key.as_str(),
            config.authz_strategy,
        ))
    }

    async fn client_for(&self, caller: &CallerIdentity) -> RepoResult<RestClient> {
        // fresh handle every time: a bound session must never serve a second request
        let mut client = RestClient::new(
            self.http.clone(),
            self.base_url.clone(),
            Arc::clone(&self.service_key),
        );

        if self.strategy == AuthzStrategy::Impersonate {
            client.bind_session(caller).await?;
        }

        Ok(client)
    }
}

#[async_trait]
impl DownstreamGateway for RestGateway {
    async fn open(&self, caller: &CallerIdentity) -> RepoResult<DownstreamHandle> {
        let client = Arc::new(self.client_for(caller).await?);

        Ok(DownstreamHandle {
            jobs: Box::new(PostgrestJobRepo::new(Arc::clone(&client))),
            files: Box::new(StorageFileStore::new(client)),
        })
    }
}
