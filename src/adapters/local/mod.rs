//! Local adapters for single-process deployment.

pub mod analyzer;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_probe;
pub mod ffprobe;
pub mod fs;
pub mod queue;
pub mod trimmer;

pub use analyzer::CommandAnalyzer;
pub use ffprobe::FfprobeProbe;
pub use fs::FsAdapter;
pub use queue::ChannelQueue;
pub use trimmer::FfmpegTrimmer;
