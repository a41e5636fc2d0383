use crate::domain::jobs::{JobId, EVIDENCE_DIR};
use crate::ports::storage::StoragePort;
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Storage areas as plain directories under a root: `<root>/<job_id>/`.
#[derive(Clone, Debug)]
pub struct FsAdapter {
    root: PathBuf,
}

impl FsAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StoragePort for FsAdapter {
    async fn allocate(&self, job_id: &JobId) -> io::Result<PathBuf> {
        let area = self.area(job_id);
        tokio::fs::create_dir_all(area.join(EVIDENCE_DIR)).await?;
        Ok(area)
    }

    async fn cleanup(&self, job_id: &JobId) -> io::Result<()> {
        match tokio::fs::remove_dir_all(self.area(job_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn area(&self, job_id: &JobId) -> PathBuf {
        self.root.join(job_id.to_string())
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        if !path_is_valid(relative) {
            return None;
        }
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        if !path_is_valid(relative) {
            return None;
        }
        Some(self.root.join(relative))
    }
}

/// A path is valid when it is non-empty, relative and only descends.
fn path_is_valid(path: &Path) -> bool {
    let mut components = path.components().peekable();
    if components.peek().is_none() {
        return false;
    }
    components.all(|component| matches!(component, Component::Normal(_)))
}
