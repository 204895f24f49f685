//! Bearer token verification -> `CallerIdentity` in request extensions.
//!
//! Runs before any handler of a protected route. Nothing downstream is touched
//! until the token verified, so a rejected request costs zero downstream calls.
//!
//! - No header, non-Bearer scheme, empty token, bad signature, wrong iss/aud,
//!   expired: 401
//! - Valid signature but no usable subject: 403

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::BearerToken;
use crate::error::AppError;
use crate::state::AppState;

/// Put the access check in front of every route of `router`.
///
/// ```ignore
/// let jobs = middleware::auth::access::apply(jobs, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 from_fn cannot take a State extractor, so pass the state explicitly.
    // route_layer: unmatched paths stay 404 instead of turning into 401
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;

    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or_else(|| {
        tracing::debug!(path = %req.uri().path(), "missing or malformed bearer credential");
        AppError::Unauthorized
    })?;

    let identity = match state.verifier.verify(token) {
        Ok(identity) => identity,
        Err(err) => {
            let token_fp = BearerToken::new(token).fingerprint();
            tracing::warn!(error = %err, %token_fp, "access token verification failed");
            return Err(if err.is_unusable_identity() {
                AppError::Forbidden
            } else {
                AppError::Unauthorized
            });
        }
    };

    tracing::debug!(user_id = %identity.subject_id, "caller verified");

    // middleware -> extractor handoff
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
