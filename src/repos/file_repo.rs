/*
 * Responsibility
 * - Attachment upload/removal against the downstream object storage
 * - Public URL construction for stored objects
 */
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::Method;
use serde_json::json;

use crate::repos::error::RepoResult;
use crate::services::downstream::RestClient;

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub bucket: String,
    pub path: String,
    pub public_url: String,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Upload without overwrite. Resolves once storage acknowledged the write.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> RepoResult<StoredFile>;

    async fn remove(&self, bucket: &str, path: &str) -> RepoResult<()>;
}

pub struct StorageFileStore {
    client: Arc<RestClient>,
}

impl StorageFileStore {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> RepoResult<String> {
        let url = self.client.endpoint(
            ["storage", "v1", "object", "public", bucket]
                .into_iter()
                .chain(path.split('/')),
        )?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl FileStore for StorageFileStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> RepoResult<StoredFile> {
        let url = self.client.endpoint(
            ["storage", "v1", "object", bucket]
                .into_iter()
                .chain(path.split('/')),
        )?;

        let req = self
            .client
            .request(Method::POST, url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes);

        self.client.send(req).await?;

        Ok(StoredFile {
            bucket: bucket.to_string(),
            path: path.to_string(),
            public_url: self.public_url(bucket, path)?,
        })
    }

    async fn remove(&self, bucket: &str, path: &str) -> RepoResult<()> {
        let url = self.client.endpoint(["storage", "v1", "object", bucket])?;

        let req = self
            .client
            .request(Method::DELETE, url)
            .json(&json!({ "prefixes": [path] }));

        self.client.send(req).await?;
        Ok(())
    }
}
