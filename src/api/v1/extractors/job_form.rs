/*
 * Responsibility
 * - Read the multipart body of POST /jobs into CreateJobForm
 * - Field names are matched loosely (snake_case or the legacy PascalCase names)
 * - Owner fields sent by the client are dropped here, they never reach the handler
 */
use axum::extract::{FromRequest, Multipart, Request};
use axum::extract::multipart::Field;

use crate::api::v1::dto::jobs::{CreateJobForm, UploadedFile};
use crate::error::AppError;
use crate::state::AppState;

enum FormField {
    Title,
    Description,
    JobLink,
    Status,
    CvFile,
    AppFile,
    Owner,
    Unknown,
}

impl FormField {
    fn from_name(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "title" => Self::Title,
            "description" => Self::Description,
            "joblink" => Self::JobLink,
            "status" | "applicationstatus" => Self::Status,
            "cvfile" => Self::CvFile,
            "appfile" => Self::AppFile,
            "ownerid" | "userid" => Self::Owner,
            _ => Self::Unknown,
        }
    }
}

fn bad_form(message: &'static str) -> AppError {
    AppError::validation("INVALID_FORM", message)
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(|e| {
        tracing::debug!(error = %e, "multipart text field unreadable");
        bad_form("malformed multipart body")
    })
}

async fn file(field: Field<'_>) -> Result<Option<UploadedFile>, AppError> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let bytes = field.bytes().await.map_err(|e| {
        tracing::debug!(error = %e, "multipart file field unreadable");
        bad_form("malformed multipart body")
    })?;

    // browsers send an empty part when no file was chosen
    if bytes.is_empty() {
        return Ok(None);
    }

    Ok(Some(UploadedFile {
        file_name,
        content_type,
        bytes,
    }))
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl FromRequest<AppState> for CreateJobForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e, "create job body is not multipart");
            bad_form("expected multipart/form-data body")
        })?;

        let mut form = CreateJobForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            tracing::debug!(error = %e, "multipart stream error");
            bad_form("malformed multipart body")
        })? {
            let name = field.name().unwrap_or_default().to_string();

            match FormField::from_name(&name) {
                FormField::Title => form.title = text(field).await?,
                FormField::Description => form.description = text(field).await?,
                FormField::JobLink => form.job_link = optional(text(field).await?),
                FormField::Status => form.status = optional(text(field).await?),
                FormField::CvFile => form.cv_file = file(field).await?,
                FormField::AppFile => form.app_file = file(field).await?,
                FormField::Owner => {
                    tracing::debug!(field = %name, "ignoring client-supplied owner field");
                }
                FormField::Unknown => {
                    tracing::debug!(field = %name, "ignoring unknown form field");
                }
            }
        }

        Ok(form)
    }
}
