//! Domain layer - Pure business logic.

pub mod av;
pub mod jobs;
pub mod report;
pub mod upload;
