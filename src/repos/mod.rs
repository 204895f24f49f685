pub mod error;
pub mod file_repo;
pub mod job_repo;
