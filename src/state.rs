/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 *   - verifier: process-wide, no per-caller state
 *   - gateway: opens a fresh downstream handle per request
 * - Cloned per request (everything inside is Arc/cheap)
 */
use std::sync::Arc;

use crate::services::auth::TokenVerifier;
use crate::services::downstream::DownstreamGateway;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<TokenVerifier>,
    pub gateway: Arc<dyn DownstreamGateway>,
    pub storage_bucket: Arc<str>,
}

impl AppState {
    pub fn new(
        verifier: Arc<TokenVerifier>,
        gateway: Arc<dyn DownstreamGateway>,
        storage_bucket: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            verifier,
            gateway,
            storage_bucket: storage_bucket.into(),
        }
    }
}
