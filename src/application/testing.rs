//! Shared fixtures for service tests.

use crate::domain::av::video_stream::VideoStream;
use crate::domain::av::AV;
use crate::domain::report::Report;
use crate::ports::analyzer::{AnalysisFailure, AnalysisRequest, Analyzer, ProgressSink};
use crate::ports::probe::MockMediaProbe;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// An H.264 MP4 as ffprobe would describe it.
pub fn mp4(duration: Option<f64>) -> AV {
    AV {
        path: "video.mp4".into(),
        format_names: vec!["mov".into(), "mp4".into(), "m4a".into()],
        duration,
        video_streams: vec![VideoStream {
            codec: "h264".into(),
            pix_fmt: Some("yuv420p".into()),
            frame_rate: Some("30/1".into()),
            width: 1280,
            height: 720,
            is_horizontal: true,
        }],
        audio_stream_count: 1,
    }
}

/// Probe that reports `long_duration` for files whose contents start with
/// `long` and `short_duration` for everything else.
pub fn probe_by_contents(long_duration: f64, short_duration: f64) -> MockMediaProbe {
    let mut probe = MockMediaProbe::new();
    probe.expect_probe().returning(move |path| {
        let contents = std::fs::read(path).unwrap_or_default();
        let duration = if contents.starts_with(b"long") {
            long_duration
        } else {
            short_duration
        };
        Ok(mp4(Some(duration)))
    });
    probe
}

/// Analyzer that immediately reports a clean video.
pub struct IdleAnalyzer;

#[async_trait]
impl Analyzer for IdleAnalyzer {
    async fn analyze(
        &self,
        _request: AnalysisRequest,
        _progress: Arc<dyn ProgressSink>,
        _cancel: CancellationToken,
    ) -> Result<Report, AnalysisFailure> {
        Ok(Report::default())
    }
}
