use super::stream::FromStream;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct VideoStream {
    pub codec: String,
    pub pix_fmt: Option<String>,
    pub frame_rate: Option<String>,
    pub width: u32,
    pub height: u32,
    pub is_horizontal: bool,
}

impl fmt::Display for VideoStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}x{}", self.codec, self.width, self.height)?;
        if !self.is_horizontal {
            f.write_str(" vertical")?;
        }
        if let Some(pix_fmt) = &self.pix_fmt {
            write!(f, " {}", pix_fmt)?;
        }
        if let Some(rate) = &self.frame_rate {
            write!(f, " @ {}", rate)?;
        }
        Ok(())
    }
}

/// Dimension in pixels. `None` when the key is absent; non-numeric or out of range reads as 0.
fn dimension(stream_data: &Value, key: &str) -> Option<u32> {
    let value = stream_data.get(key)?;
    Some(value.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0))
}

impl FromStream for VideoStream {
    fn from_stream(stream_data: &Value) -> Option<Box<Self>> {
        if let Some(codec_type) = stream_data.get("codec_type").and_then(|v| v.as_str()) {
            match codec_type {
                "video" => {
                    let width = dimension(stream_data, "width")?;
                    let height = dimension(stream_data, "height")?;
                    let is_horizontal = width > height;
                    let text = |key: &str| {
                        stream_data
                            .get(key)
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                    };

                    Some(Box::new(VideoStream {
                        codec: text("codec_name")?,
                        pix_fmt: text("pix_fmt"),
                        frame_rate: text("avg_frame_rate").or_else(|| text("r_frame_rate")),
                        width,
                        height,
                        is_horizontal,
                    }))
                }
                _ => None,
            }
        } else {
            None
        }
    }
}
