//! Clipguard - Video safety analysis job service
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (jobs, reports, media probing model)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (HTTP, filesystem, external tools)
//! - application/: Services that use ports
//! - config: Environment configuration
//!
//! # Features
//! - `ffmpeg`: probe uploads in-process through libav instead of `ffprobe`

pub mod adapters;
pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod sanitize;

pub use app::{App, Collaborators};
pub use config::AppConfig;
pub use error::{Error, Result};
