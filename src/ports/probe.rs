use crate::domain::av::{ProbeError, AV};
use async_trait::async_trait;
use std::path::Path;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Read container format, streams and duration of a media file
    async fn probe(&self, path: &Path) -> Result<AV, ProbeError>;
}
