//! In-process probing through libav, for deployments built with the
//! `ffmpeg` feature.

use crate::domain::av::video_stream::VideoStream;
use crate::domain::av::{ProbeError, AV};
use crate::ports::probe::MediaProbe;
use async_trait::async_trait;
use ffmpeg_next as ffmpeg;
use std::path::Path;
use tokio::task;

#[derive(Default)]
pub struct FfmpegProbe;

#[async_trait]
impl MediaProbe for FfmpegProbe {
    async fn probe(&self, path: &Path) -> Result<AV, ProbeError> {
        let path = path.to_path_buf();
        task::spawn_blocking(move || {
            ffmpeg::init().map_err(|e| ProbeError::Parse(e.to_string()))?;
            let context = ffmpeg::format::input(&path).map_err(|_| ProbeError::Unreadable)?;

            let duration = match context.duration() {
                d if d > 0 => Some(d as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE)),
                _ => None,
            };

            let mut video_streams = Vec::new();
            let mut audio_stream_count = 0;
            for stream in context.streams() {
                let parameters = stream.parameters();
                match parameters.medium() {
                    ffmpeg::media::Type::Video => {
                        let decoder = ffmpeg::codec::context::Context::from_parameters(parameters)
                            .and_then(|ctx| ctx.decoder().video())
                            .map_err(|e| ProbeError::Parse(e.to_string()))?;
                        let rate = stream.avg_frame_rate();
                        video_streams.push(VideoStream {
                            codec: format!("{:?}", decoder.id()).to_lowercase(),
                            pix_fmt: Some(format!("{:?}", decoder.format()).to_lowercase()),
                            frame_rate: Some(format!("{}/{}", rate.numerator(), rate.denominator())),
                            width: decoder.width(),
                            height: decoder.height(),
                            is_horizontal: decoder.width() > decoder.height(),
                        });
                    }
                    ffmpeg::media::Type::Audio => audio_stream_count += 1,
                    _ => {}
                }
            }

            Ok(AV {
                path: path.clone(),
                format_names: context
                    .format()
                    .name()
                    .split(',')
                    .map(str::to_string)
                    .collect(),
                duration,
                video_streams,
                audio_stream_count,
            })
        })
        .await
        .map_err(|e| ProbeError::Parse(e.to_string()))?
    }
}
