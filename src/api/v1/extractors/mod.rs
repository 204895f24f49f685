pub mod auth_ctx;
mod job_form;
mod job_id;

pub use auth_ctx::{BearerToken, Caller, CallerIdentity};
pub use job_id::JobId;
