/*
 * Responsibility
 * - /jobs handlers: list, create (multipart + file upload), delete
 * - The owner is always the verified caller (Caller extractor); nothing in the request body
 *   or path can choose it
 * - Each request opens its own downstream handle through the gateway
 */
use axum::{
    Json,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    api::v1::{
        dto::jobs::{CreateJobForm, DeleteJobResponse, JobResponse, UploadedFile, to_dto},
        extractors::{Caller, CallerIdentity, JobId},
    },
    error::AppError,
    repos::{
        error::RepoError,
        file_repo::{FileStore, StoredFile},
        job_repo::NewJobRow,
    },
    services::downstream::DownstreamHandle,
    state::AppState,
};

#[derive(Debug, Clone, Copy)]
enum FileKind {
    Cv,
    App,
}

impl FileKind {
    fn as_str(self) -> &'static str {
        match self {
            FileKind::Cv => "cv",
            FileKind::App => "app",
        }
    }
}

/// `{owner}/{kind}/{random}[.ext]`: never derived from the client file name, so two
/// uploads cannot collide and a client cannot write outside its own prefix.
fn object_path(owner_id: Uuid, kind: FileKind, file: &UploadedFile) -> String {
    let name = Uuid::new_v4();
    match file.extension() {
        Some(ext) => format!("{owner_id}/{}/{name}.{ext}", kind.as_str()),
        None => format!("{owner_id}/{}/{name}", kind.as_str()),
    }
}

fn downstream_failure(op: &'static str, caller: &CallerIdentity, err: RepoError) -> AppError {
    match &err {
        RepoError::SessionExpired | RepoError::Session(_) => {
            tracing::warn!(op, user_id = %caller.subject_id, error = %err, "downstream session refused");
        }
        _ => {
            tracing::error!(op, user_id = %caller.subject_id, error = %err, "downstream call failed");
        }
    }
    err.into()
}

async fn open(state: &AppState, caller: &CallerIdentity) -> Result<DownstreamHandle, AppError> {
    state
        .gateway
        .open(caller)
        .await
        .map_err(|e| downstream_failure("open", caller, e))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<JobResponse>>, AppError> {
    let handle = open(&state, &caller).await?;

    let rows = handle
        .jobs
        .list_owned(caller.subject_id)
        .await
        .map_err(|e| downstream_failure("list_jobs", &caller, e))?;

    let total = rows.len();
    let res: Vec<JobResponse> = rows
        .iter()
        .filter(|row| row.owner_id == caller.subject_id)
        .map(to_dto)
        .collect();

    if res.len() != total {
        // the owner predicate was sent; anything else coming back is a downstream fault
        tracing::error!(
            user_id = %caller.subject_id,
            dropped = total - res.len(),
            "downstream returned rows owned by another user"
        );
    }

    Ok(Json(res))
}

/// Remove uploaded objects after a failed create. Best effort: failures are logged.
async fn discard_uploads(files: &dyn FileStore, uploaded: &[StoredFile]) {
    for stored in uploaded {
        if let Err(err) = files.remove(&stored.bucket, &stored.path).await {
            tracing::error!(
                bucket = %stored.bucket,
                path = %stored.path,
                error = %err,
                "orphaned upload could not be removed"
            );
        }
    }
}

pub async fn create_job(
    State(state): State<AppState>,
    Caller(caller): Caller,
    form: CreateJobForm,
) -> Result<Response, AppError> {
    // reject before touching storage or the table
    form.validate()
        .map_err(|msg| AppError::validation("VALIDATION_ERROR", msg))?;

    let handle = open(&state, &caller).await?;
    let owner_id = caller.subject_id;

    let mut uploaded: Vec<StoredFile> = Vec::with_capacity(2);
    let mut urls: [Option<String>; 2] = [None, None];

    for (slot, (kind, file)) in [(FileKind::Cv, &form.cv_file), (FileKind::App, &form.app_file)]
        .into_iter()
        .enumerate()
    {
        let Some(file) = file else { continue };
        let path = object_path(owner_id, kind, file);

        match handle
            .files
            .upload(
                &state.storage_bucket,
                &path,
                file.bytes.clone(),
                &file.content_type,
            )
            .await
        {
            Ok(stored) => {
                urls[slot] = Some(stored.public_url.clone());
                uploaded.push(stored);
            }
            Err(err) => {
                discard_uploads(&*handle.files, &uploaded).await;
                return Err(downstream_failure("upload", &caller, err));
            }
        }
    }

    let [cv_file_url, app_file_url] = urls;
    let new_job = NewJobRow {
        owner_id,
        title: form.title.trim().to_string(),
        description: form.description.trim().to_string(),
        job_link: form.job_link,
        cv_file_url,
        app_file_url,
        status: form.status,
    };

    let row = match handle.jobs.insert(&new_job).await {
        Ok(row) => row,
        Err(err) => {
            discard_uploads(&*handle.files, &uploaded).await;
            return Err(downstream_failure("insert", &caller, err));
        }
    };

    tracing::info!(user_id = %owner_id, job_id = %row.id, files = uploaded.len(), "job created");

    let body = to_dto(&row);
    let location = HeaderValue::from_str(&format!("/jobs/{}", row.id))
        .map_err(|_| AppError::Internal)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response())
}

pub async fn delete_job(
    State(state): State<AppState>,
    Caller(caller): Caller,
    JobId(id): JobId,
) -> Result<Json<DeleteJobResponse>, AppError> {
    let handle = open(&state, &caller).await?;

    let deleted = handle
        .jobs
        .delete_owned(id, caller.subject_id)
        .await
        .map_err(|e| downstream_failure("delete_job", &caller, e))?;

    if !deleted {
        // absent and not-yours look the same to the caller
        return Err(AppError::not_found("job"));
    }

    tracing::info!(user_id = %caller.subject_id, job_id = %id, "job deleted");
    Ok(Json(DeleteJobResponse::new(id)))
}
