/*
 * Responsibility
 * - job_applications access through the downstream REST interface
 * - Every read and delete carries the owner predicate (user_id = caller)
 * - Column names follow the existing table; unknown columns are ignored on read
 */
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repos::error::{RepoError, RepoResult};
use crate::services::downstream::RestClient;

pub const JOBS_TABLE: &str = "job_applications";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRow {
    pub id: Uuid,
    #[serde(rename = "user_id")]
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub job_link: Option<String>,
    #[serde(default)]
    pub cv_file_url: Option<String>,
    #[serde(default)]
    pub app_file_url: Option<String>,
    #[serde(rename = "application_status", default)]
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload. `id` and `created_at` are assigned downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewJobRow {
    #[serde(rename = "user_id")]
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub job_link: Option<String>,
    pub cv_file_url: Option<String>,
    pub app_file_url: Option<String>,
    #[serde(rename = "application_status")]
    pub status: Option<String>,
}

#[async_trait]
pub trait JobRepo: Send + Sync {
    /// Records owned by `owner_id`, newest first.
    async fn list_owned(&self, owner_id: Uuid) -> RepoResult<Vec<JobRow>>;

    /// Insert and return the stored row.
    async fn insert(&self, new_job: &NewJobRow) -> RepoResult<JobRow>;

    /// Delete `id` only if it is owned by `owner_id`, in one call.
    /// Returns false when nothing matched (absent or someone else's).
    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> RepoResult<bool>;
}

/// PostgREST-backed repository bound to one request-scoped client.
pub struct PostgrestJobRepo {
    client: Arc<RestClient>,
}

impl PostgrestJobRepo {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    fn table_url(&self) -> RepoResult<url::Url> {
        self.client.endpoint(["rest", "v1", JOBS_TABLE])
    }
}

fn eq(value: Uuid) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl JobRepo for PostgrestJobRepo {
    async fn list_owned(&self, owner_id: Uuid) -> RepoResult<Vec<JobRow>> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("user_id", &eq(owner_id))
            .append_pair("order", "created_at.desc");

        let res = self.client.send(self.client.request(Method::GET, url)).await?;

        res.json::<Vec<JobRow>>()
            .await
            .map_err(|e| RepoError::Decode(e.to_string()))
    }

    async fn insert(&self, new_job: &NewJobRow) -> RepoResult<JobRow> {
        let url = self.table_url()?;

        let req = self
            .client
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(new_job);

        let rows = self
            .client
            .send(req)
            .await?
            .json::<Vec<JobRow>>()
            .await
            .map_err(|e| RepoError::Decode(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::Decode("insert returned no row".into()))
    }

    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> RepoResult<bool> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("id", &eq(id))
            .append_pair("user_id", &eq(owner_id));

        let req = self
            .client
            .request(Method::DELETE, url)
            .header("Prefer", "return=representation");

        let deleted = self
            .client
            .send(req)
            .await?
            .json::<Vec<JobRow>>()
            .await
            .map_err(|e| RepoError::Decode(e.to_string()))?;

        Ok(!deleted.is_empty())
    }
}
