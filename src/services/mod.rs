pub mod auth;
pub mod downstream;
