use super::stream::{parse_probe_output, FromStream};
use super::video_stream::VideoStream;
use super::ProbeError;
use std::path::{Path, PathBuf};

/// Container-level facts about a media file.
#[derive(Debug, Clone, PartialEq)]
pub struct AV {
    pub path: PathBuf,
    pub format_names: Vec<String>,
    pub duration: Option<f64>,
    pub video_streams: Vec<VideoStream>,
    pub audio_stream_count: usize,
}

impl AV {
    pub fn from_probe_json(path: &Path, raw: &str) -> Result<AV, ProbeError> {
        let output = parse_probe_output(raw)?;

        Ok(AV {
            path: path.to_path_buf(),
            format_names: output.format_names,
            duration: output.duration,
            video_streams: output
                .streams
                .iter()
                .filter_map(|stream| VideoStream::from_stream(stream))
                .map(|stream| *stream)
                .collect(),
            audio_stream_count: output
                .streams
                .iter()
                .filter(|stream| {
                    stream.get("codec_type").and_then(|v| v.as_str()) == Some("audio")
                })
                .count(),
        })
    }

    pub fn is_mp4(&self) -> bool {
        self.format_names.iter().any(|name| name == "mp4")
    }

    pub fn has_video(&self) -> bool {
        !self.video_streams.is_empty()
    }

    /// Duration in seconds when the container reports a usable one.
    pub fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }
}
