//! Ports - Trait definitions for the collaborators the services depend on.

pub mod analyzer;
pub mod probe;
pub mod queue;
pub mod storage;
pub mod trimmer;
