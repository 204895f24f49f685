/**
 * Responsibility
 * - What the downstream layer reports upwards
 * - Carries full detail for server-side logs; AppError decides what the client sees
 */
use reqwest::StatusCode;
use thiserror::Error;

use crate::services::downstream::SessionError;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("downstream transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("downstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("downstream session expired and cannot be refreshed")]
    SessionExpired,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("unexpected downstream response: {0}")]
    Decode(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

const MAX_LOGGED_BODY: usize = 512;

impl RepoError {
    pub fn status(status: StatusCode, mut body: String) -> Self {
        if body.len() > MAX_LOGGED_BODY {
            let mut cut = MAX_LOGGED_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Self::Status { status, body }
    }
}
