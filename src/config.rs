//! Configuration loaded from the environment (and an optional `.env` file).

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_MAX_VIDEO_SECONDS: f64 = 60.0;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 3 * 1024 * 1024;
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 600;
const DEFAULT_ANALYSIS_WORKERS: usize = 4;
const DEFAULT_JOB_TTL_SECS: u64 = 3600;
const DEFAULT_JANITOR_INTERVAL_SECS: u64 = 60;
const DEFAULT_STATUS_POLL_RATE: u32 = 5;

/// External analyzer invocation.
#[derive(Clone, Default)]
pub struct AnalyzerConfig {
    /// Executable run once per job. Required to serve traffic.
    pub command: Option<PathBuf>,
    /// Leading arguments placed before the video and evidence paths.
    pub args: Vec<String>,
    /// Credential forwarded to the analyzer process. Never logged.
    pub api_key: Option<String>,
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Root directory holding one scratch area per job
    pub storage_root: PathBuf,
    /// Longest video admitted without trimming, in seconds
    pub max_video_seconds: f64,
    /// Upload size ceiling in bytes
    pub max_upload_bytes: u64,
    /// Wall-clock ceiling for one analysis run
    pub analysis_timeout: Duration,
    /// Number of background analysis workers
    pub analysis_workers: usize,
    /// Age after which abandoned jobs and pending uploads are swept
    pub job_ttl: Duration,
    pub janitor_interval: Duration,
    /// Allowed status polls per second for a single job
    pub status_poll_rate: u32,
    pub ffprobe_path: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub analyzer: AnalyzerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: String::from("127.0.0.1"),
            port: String::from("3000"),
            storage_root: PathBuf::from("./storage"),
            max_video_seconds: DEFAULT_MAX_VIDEO_SECONDS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            analysis_timeout: Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS),
            analysis_workers: DEFAULT_ANALYSIS_WORKERS,
            job_ttl: Duration::from_secs(DEFAULT_JOB_TTL_SECS),
            janitor_interval: Duration::from_secs(DEFAULT_JANITOR_INTERVAL_SECS),
            status_poll_rate: DEFAULT_STATUS_POLL_RATE,
            ffprobe_path: PathBuf::from("ffprobe"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from any key/value source. Missing or invalid
    /// values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            addr: text("ADDR").unwrap_or(defaults.addr),
            port: text("PORT").unwrap_or(defaults.port),
            storage_root: text("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            max_video_seconds: parse_or(&lookup, "MAX_VIDEO_SECONDS", defaults.max_video_seconds)
                .max(1.0),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            analysis_timeout: Duration::from_secs(parse_or(
                &lookup,
                "ANALYSIS_TIMEOUT_SECS",
                DEFAULT_ANALYSIS_TIMEOUT_SECS,
            )),
            analysis_workers: parse_or(&lookup, "ANALYSIS_WORKERS", defaults.analysis_workers)
                .max(1),
            job_ttl: Duration::from_secs(parse_or(&lookup, "JOB_TTL_SECS", DEFAULT_JOB_TTL_SECS)),
            janitor_interval: Duration::from_secs(
                parse_or(&lookup, "JANITOR_INTERVAL_SECS", DEFAULT_JANITOR_INTERVAL_SECS).max(1),
            ),
            status_poll_rate: parse_or(&lookup, "STATUS_POLL_RATE_PER_SEC", defaults.status_poll_rate)
                .max(1),
            ffprobe_path: text("FFPROBE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffprobe_path),
            ffmpeg_path: text("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            analyzer: AnalyzerConfig {
                command: text("ANALYZER_CMD").map(PathBuf::from),
                args: text("ANALYZER_ARGS")
                    .map(|args| args.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default(),
                api_key: text("ANALYZER_API_KEY"),
            },
        }
    }

    /// Values that must never appear in client-facing messages.
    pub fn secrets(&self) -> Vec<String> {
        self.analyzer.api_key.iter().cloned().collect()
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + fmt::Debug,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid value for {}, using default {:?}", key, default);
                default
            }
        },
        _ => default,
    }
}
