//! Application services: track orchestration and its collaborator contracts.

pub mod error;
pub mod repos;
pub mod tracks;
pub mod warmup;
