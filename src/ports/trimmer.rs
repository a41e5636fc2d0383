use async_trait::async_trait;
use std::io;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum TrimFailure {
    #[error("failed to run trimmer: {0}")]
    Io(#[from] io::Error),
    #[error("trimmer exited with status {0:?}")]
    Failed(Option<i32>),
    #[error("trimmer produced no output")]
    NoOutput,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Trimmer: Send + Sync {
    /// Write the first `max_seconds` of `input` to `output`
    async fn trim(&self, input: &Path, output: &Path, max_seconds: f64) -> Result<(), TrimFailure>;
}
