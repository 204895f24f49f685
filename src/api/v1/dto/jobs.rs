/*
 * Responsibility
 * - Job application request form / response DTO
 * - validate() for shape checks that must pass before anything goes downstream
 * - to_dto(): the only way a stored record becomes a response body
 */
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::repos::job_repo::JobRow;

/// A file part from the create form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Extension taken from the client file name, lowercased, alphanumeric only.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || ext.len() > 8 {
            return None;
        }
        if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Multipart body of `POST /jobs`.
///
/// No owner field: the owner is always the verified caller.
#[derive(Debug, Default)]
pub struct CreateJobForm {
    pub title: String,
    pub description: String,
    pub job_link: Option<String>,
    pub status: Option<String>,
    pub cv_file: Option<UploadedFile>,
    pub app_file: Option<UploadedFile>,
}

impl CreateJobForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("title is required");
        }
        if self.description.trim().is_empty() {
            return Err("description is required");
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Project a stored record onto the public response shape.
///
/// Empty strings from the store are treated the same as absent values.
pub fn to_dto(row: &JobRow) -> JobResponse {
    JobResponse {
        id: row.id,
        owner_id: row.owner_id,
        title: row.title.clone(),
        description: row.description.clone(),
        job_link: non_empty(&row.job_link),
        cv_file_url: non_empty(&row.cv_file_url),
        app_file_url: non_empty(&row.app_file_url),
        status: non_empty(&row.status),
        created_at: row.created_at,
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Serialize)]
pub struct DeleteJobResponse {
    pub id: Uuid,
    pub message: String,
}

impl DeleteJobResponse {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            message: format!("Job with id {id} deleted successfully."),
        }
    }
}
