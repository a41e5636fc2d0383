//! Audio/Video probing model.

pub mod av;
pub mod stream;
pub mod video_stream;

pub use av::AV;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run media probe: {0}")]
    Io(#[from] std::io::Error),
    #[error("media probe could not read the file")]
    Unreadable,
    #[error("unparseable probe output: {0}")]
    Parse(String),
}
