//! Analysis report produced by the external analyzer.
//!
//! The analyzer owns the shape of this payload. Only the fields the service
//! reads or rewrites are typed; everything else is kept in `extra` so the
//! report reaches clients unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub analysis_metadata: AnalysisMetadata,
    #[serde(default)]
    pub incidents: Vec<Incident>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub violence_detected: bool,
    #[serde(default)]
    pub highest_confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_ranges_with_violence: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    #[serde(default)]
    pub total_sequences_analyzed: u32,
    #[serde(default)]
    pub violence_incidents_found: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(default)]
    pub inappropriate_behavior_detected: bool,
    #[serde(default)]
    pub time_range: TimeRange,
    #[serde(default)]
    pub confidence_percentage: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_image_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default)]
    pub start_formatted: String,
    #[serde(default)]
    pub end_formatted: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_seconds: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TimeRange {
    pub fn from_seconds(start: f64, end: f64) -> Self {
        Self {
            start_formatted: format_timestamp(start),
            end_formatted: format_timestamp(end),
            start_seconds: Some(start),
            end_seconds: Some(end),
            extra: Map::new(),
        }
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.start_formatted, self.end_formatted)
    }
}

impl Report {
    /// Every free-form map in the report, outermost first.
    pub fn extra_maps_mut(&mut self) -> Vec<&mut Map<String, Value>> {
        let mut maps = vec![
            &mut self.extra,
            &mut self.summary.extra,
            &mut self.analysis_metadata.extra,
        ];
        for incident in &mut self.incidents {
            maps.push(&mut incident.extra);
            maps.push(&mut incident.time_range.extra);
        }
        maps
    }

    pub fn summary_text(&self) -> String {
        let analyzed = self.analysis_metadata.total_sequences_analyzed;
        if self.summary.violence_detected {
            format!(
                "violence detected in {} of {} analyzed sequences (highest confidence {}%)",
                self.analysis_metadata.violence_incidents_found,
                analyzed,
                self.summary.highest_confidence
            )
        } else {
            format!("no violence detected in {} analyzed sequences", analyzed)
        }
    }
}

/// Formats seconds as `m:ss`.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Accumulates per-sequence verdicts into a [`Report`], keeping the summary
/// and counters consistent with the incidents.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    report: Report,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incident(
        mut self,
        start: f64,
        end: f64,
        detected: bool,
        confidence: f64,
        description: &str,
    ) -> Self {
        let time_range = TimeRange::from_seconds(start, end);
        let metadata = &mut self.report.analysis_metadata;
        let summary = &mut self.report.summary;

        metadata.total_sequences_analyzed += 1;
        if detected {
            metadata.violence_incidents_found += 1;
            summary.violence_detected = true;
            summary.time_ranges_with_violence.push(time_range.label());
        }
        if confidence > summary.highest_confidence {
            summary.highest_confidence = confidence;
        }

        self.report.incidents.push(Incident {
            inappropriate_behavior_detected: detected,
            time_range,
            confidence_percentage: confidence,
            description: description.to_string(),
            web_image_path: None,
            extra: Map::new(),
        });
        self
    }

    /// Attaches an evidence image to the most recently added incident.
    pub fn with_image(mut self, path: &str) -> Self {
        if let Some(incident) = self.report.incidents.last_mut() {
            incident.web_image_path = Some(path.to_string());
        }
        self
    }

    pub fn build(self) -> Report {
        self.report
    }
}
