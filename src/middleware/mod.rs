/*
 * Responsibility
 * - Public interface of the middleware layer
 * - auth::access (bearer verification), cors, http (request id / limits / timeout / trace),
 *   security_headers
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
