use super::ProbeError;
use serde_json::Value;

pub trait FromStream {
    fn from_stream(stream_data: &Value) -> Option<Box<Self>>
    where
        Self: Sized;
}

/// Fields extracted from `ffprobe -show_format -show_streams -print_format json`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutput {
    pub format_names: Vec<String>,
    pub duration: Option<f64>,
    pub streams: Vec<Value>,
}

pub fn parse_probe_output(raw: &str) -> Result<ProbeOutput, ProbeError> {
    let v: Value = serde_json::from_str(raw).map_err(|e| ProbeError::Parse(e.to_string()))?;

    let format = v
        .get("format")
        .ok_or_else(|| ProbeError::Parse("missing format section".to_string()))?;

    let format_names = format
        .get("format_name")
        .and_then(|name| name.as_str())
        .map(|names| {
            names
                .split(',')
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    // ffprobe prints durations as strings, other tools as numbers.
    let duration = format.get("duration").and_then(|duration| match duration {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    });

    let streams = v
        .get("streams")
        .and_then(|streams| streams.as_array())
        .cloned()
        .unwrap_or_default();

    Ok(ProbeOutput {
        format_names,
        duration,
        streams,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FFPROBE_MP4: &str = r#"{
        "streams": [
            { "index": 0, "codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720 },
            { "index": 1, "codec_type": "audio", "codec_name": "aac" }
        ],
        "format": {
            "filename": "upload.part",
            "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
            "duration": "45.046000"
        }
    }"#;

    #[test]
    fn test_parse_probe_output_reads_format_and_duration() {
        let output = parse_probe_output(FFPROBE_MP4).unwrap();
        assert!(output.format_names.contains(&"mp4".to_string()));
        assert_eq!(output.duration, Some(45.046));
        assert_eq!(output.streams.len(), 2);
    }

    #[test]
    fn test_parse_probe_output_numeric_duration() {
        let raw = r#"{ "format": { "format_name": "avi", "duration": 12.5 }, "streams": [] }"#;
        let output = parse_probe_output(raw).unwrap();
        assert_eq!(output.format_names, vec!["avi"]);
        assert_eq!(output.duration, Some(12.5));
    }

    #[test]
    fn test_parse_probe_output_missing_duration() {
        let raw = r#"{ "format": { "format_name": "mov,mp4", "duration": "N/A" } }"#;
        let output = parse_probe_output(raw).unwrap();
        assert_eq!(output.duration, None);
        assert!(output.streams.is_empty());
    }

    #[test]
    fn test_parse_probe_output_rejects_garbage() {
        assert!(matches!(parse_probe_output("not json"), Err(ProbeError::Parse(_))));
        assert!(matches!(parse_probe_output("{}"), Err(ProbeError::Parse(_))));
    }
}
