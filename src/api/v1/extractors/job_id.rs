/*
 * Responsibility
 * - Take the {id} path segment as a String and turn it into the record UUID
 * - A malformed id is a 400 with our error body, not axum's default rejection
 */
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobId(pub Uuid);

impl FromRequestParts<AppState> for JobId {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::validation("INVALID_JOB_ID", "invalid job id"))?;

        Uuid::parse_str(raw.trim())
            .map(JobId)
            .map_err(|_| AppError::validation("INVALID_JOB_ID", "job id must be a UUID"))
    }
}
