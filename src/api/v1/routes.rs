/*
 * Responsibility
 * - URL structure of the job tracker API
 * - /health is public; everything under /jobs goes through the access middleware
 */
use axum::{
    Router,
    routing::{delete, get},
};

use crate::api::v1::handlers::{
    health::health,
    jobs::{create_job, delete_job, list_jobs},
};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let jobs = Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/{id}", delete(delete_job));
    let jobs = middleware::auth::access::apply(jobs, state);

    Router::new().route("/health", get(health)).merge(jobs)
}
