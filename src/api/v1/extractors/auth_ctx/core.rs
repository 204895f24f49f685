use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

use super::CallerIdentity;

/// Extractor handing the verified `CallerIdentity` to a handler.
///
/// The access middleware must have inserted it into the request extensions;
/// if it is missing (route not behind the middleware) the request is 401.
pub struct Caller(pub CallerIdentity);

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .map(Caller)
            .ok_or(AppError::Unauthorized)
    }
}
