/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - Provide the verified caller (CallerIdentity) to handlers
 * - axum-specific code stays in core, the types live in types
 *
 * Public API:
 * - BearerToken
 * - CallerIdentity
 * - Caller
 */

mod core;
mod types;

pub use self::core::Caller;
pub use types::{BearerToken, CallerIdentity};
