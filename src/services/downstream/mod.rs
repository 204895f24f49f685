pub mod client;
pub mod gateway;
pub mod session;

pub use client::{Authority, RestClient};
pub use gateway::{DownstreamGateway, DownstreamHandle, RestGateway};
pub use session::{Session, SessionError};
