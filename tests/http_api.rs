//! End-to-end tests of the HTTP surface with fake media tools and analyzers.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use clipguard::config::AppConfig;
use clipguard::domain::av::video_stream::VideoStream;
use clipguard::domain::av::{ProbeError, AV};
use clipguard::domain::report::{Report, ReportBuilder};
use clipguard::ports::analyzer::{AnalysisFailure, AnalysisRequest, Analyzer, ProgressSink};
use clipguard::ports::probe::MediaProbe;
use clipguard::ports::trimmer::{TrimFailure, Trimmer};
use clipguard::{App, Collaborators};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const BOUNDARY: &str = "clipguard-test-boundary";

/// Reports 90 seconds for files starting with `long`, 45 otherwise.
struct ContentProbe;

#[async_trait]
impl MediaProbe for ContentProbe {
    async fn probe(&self, path: &Path) -> Result<AV, ProbeError> {
        let contents = tokio::fs::read(path).await.map_err(|_| ProbeError::Unreadable)?;
        let duration = if contents.starts_with(b"long") { 90.0 } else { 45.0 };
        Ok(AV {
            path: path.to_path_buf(),
            format_names: vec!["mov".into(), "mp4".into()],
            duration: Some(duration),
            video_streams: vec![VideoStream {
                codec: "h264".into(),
                pix_fmt: Some("yuv420p".into()),
                frame_rate: Some("30/1".into()),
                width: 1280,
                height: 720,
                is_horizontal: true,
            }],
            audio_stream_count: 1,
        })
    }
}

/// Writes a short video in place of the real cut.
struct CopyTrimmer;

#[async_trait]
impl Trimmer for CopyTrimmer {
    async fn trim(&self, _input: &Path, output: &Path, _max_seconds: f64) -> Result<(), TrimFailure> {
        tokio::fs::write(output, b"short").await?;
        Ok(())
    }
}

enum Behaviour {
    Clean,
    WithEvidence,
    FailWithPath,
    Block,
}

struct FakeAnalyzer(Behaviour);

#[async_trait]
impl Analyzer for FakeAnalyzer {
    async fn analyze(
        &self,
        request: AnalysisRequest,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<Report, AnalysisFailure> {
        progress.report(35, "Analyzing frames");
        match self.0 {
            Behaviour::Clean => Ok(ReportBuilder::new()
                .incident(0.0, 4.0, false, 12.0, "People talking")
                .build()),
            Behaviour::WithEvidence => {
                let image = request.evidence_dir.join("seq_1.jpg");
                tokio::fs::write(&image, b"jpeg bytes")
                    .await
                    .map_err(AnalysisFailure::Io)?;
                Ok(ReportBuilder::new()
                    .incident(0.0, 4.0, true, 91.0, "Pushing")
                    .with_image(image.to_str().unwrap_or_default())
                    .build())
            }
            Behaviour::FailWithPath => Err(AnalysisFailure::Collaborator(format!(
                "model crashed reading {} with key sk-test-abcdefghijkl",
                request.video_path.display()
            ))),
            Behaviour::Block => {
                cancel.cancelled().await;
                Err(AnalysisFailure::Cancelled)
            }
        }
    }
}

struct Harness {
    router: Router,
    app: App,
    storage: TempDir,
}

fn harness(behaviour: Behaviour, poll_rate: u32) -> Harness {
    let storage = TempDir::new().unwrap();
    let config = AppConfig {
        storage_root: storage.path().to_path_buf(),
        max_video_seconds: 60.0,
        max_upload_bytes: 1024,
        analysis_timeout: Duration::from_secs(5),
        analysis_workers: 2,
        status_poll_rate: poll_rate,
        ..AppConfig::default()
    };
    let collaborators = Collaborators {
        probe: Arc::new(ContentProbe),
        trimmer: Arc::new(CopyTrimmer),
        analyzer: Arc::new(FakeAnalyzer(behaviour)),
    };
    let app = App::new(config, collaborators);
    app.start_background();
    Harness {
        router: app.router(),
        app,
        storage,
    }
}

fn multipart_request(file_name: &str, contents: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"video\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: video/mp4\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn wait_for_status(router: &Router, job_id: &str, wanted: &str) -> Value {
    for _ in 0..200 {
        let (code, body) = send(router, empty_request("GET", &format!("/status/{}", job_id))).await;
        if code == StatusCode::OK && body["status"] == wanted {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {} never reached {}", job_id, wanted);
}

#[tokio::test]
async fn test_short_upload_runs_to_completion() {
    let h = harness(Behaviour::Clean, 1000);

    let (code, body) = send(&h.router, multipart_request("clip.mp4", b"short video")).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["message"], "Video uploaded successfully. Processing started.");
    assert_eq!(body["duration"], 45.0);
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let status = wait_for_status(&h.router, &job_id, "completed").await;
    assert_eq!(status["progress"], 100);
    assert_eq!(status["result"]["analysis_metadata"]["total_sequences_analyzed"], 1);
    assert_eq!(status["result"]["summary"]["violence_detected"], false);
    assert!(status.get("error").is_none());
    assert!(status["finished_at"].is_string());
}

async fn fetch(router: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = router.clone().oneshot(empty_request("GET", uri)).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, bytes.to_vec())
}

#[tokio::test]
async fn test_evidence_images_are_served_until_cleanup() {
    let h = harness(Behaviour::WithEvidence, 1000);

    let (_, body) = send(&h.router, multipart_request("clip.mp4", b"short video")).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();
    let status = wait_for_status(&h.router, &job_id, "completed").await;

    let image = status["result"]["incidents"][0]["web_image_path"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(image, format!("{}/evidence/seq_1.jpg", job_id));

    let (code, content_type, bytes) = fetch(&h.router, &format!("/evidence/{}", image)).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(bytes, b"jpeg bytes");

    // Only the evidence directory is reachable.
    let (code, _, _) = fetch(&h.router, &format!("/evidence/{}/video.mp4", job_id)).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    let (code, _, _) = fetch(
        &h.router,
        &format!("/evidence/{}/evidence/%2E%2E/video.mp4", job_id),
    )
    .await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    let (code, _, _) = fetch(&h.router, "/evidence/not-a-job/evidence/seq_1.jpg").await;
    assert_eq!(code, StatusCode::NOT_FOUND);

    send(&h.router, empty_request("POST", &format!("/cleanup/{}", job_id))).await;
    let (code, _, _) = fetch(&h.router, &format!("/evidence/{}", image)).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_long_upload_is_trimmed_into_a_new_job() {
    let h = harness(Behaviour::Clean, 1000);

    let (code, body) = send(&h.router, multipart_request("long.mp4", b"long video")).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["needs_trimming"], true);
    assert_eq!(body["original_duration"], 90.0);
    assert_eq!(body["max_duration"], 60.0);
    assert_eq!(
        body["message"],
        "Video is 90.0 seconds long. Would you like to analyze the first 60 seconds?"
    );
    let original = body["job_id"].as_str().unwrap().to_string();
    let temp_video_path = body["temp_video_path"].as_str().unwrap().to_string();
    assert!(!temp_video_path.starts_with('/'));

    // No job exists until the client opts in.
    let (code, _) = send(&h.router, empty_request("GET", &format!("/status/{}", original))).await;
    assert_eq!(code, StatusCode::NOT_FOUND);

    let trim = json!({ "job_id": original, "temp_video_path": temp_video_path });
    let (code, body) = send(&h.router, json_request("POST", "/trim-and-analyze", trim.clone())).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["trimmed_duration"], 45.0);
    let trimmed = body["job_id"].as_str().unwrap().to_string();
    assert_ne!(trimmed, original);
    wait_for_status(&h.router, &trimmed, "completed").await;

    // The pending upload is consumed by the first trim.
    let (code, body) = send(&h.router, json_request("POST", "/trim-and-analyze", trim)).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No pending upload for this job");
}

#[tokio::test]
async fn test_trim_request_without_fields_is_rejected() {
    let h = harness(Behaviour::Clean, 1000);

    let (code, body) = send(
        &h.router,
        json_request("POST", "/trim-and-analyze", json!({ "job_id": "abc" })),
    )
    .await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required data");
}

#[tokio::test]
async fn test_wrong_extension_is_rejected() {
    let h = harness(Behaviour::Clean, 1000);

    let (code, body) = send(&h.router, multipart_request("clip.avi", b"short video")).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only MP4 video files are allowed");
    assert!(h.app.registry().is_empty());

    let leftovers = std::fs::read_dir(h.storage.path()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let h = harness(Behaviour::Clean, 1000);

    let (code, body) = send(&h.router, multipart_request("clip.mp4", &[b'x'; 2048])).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File size must be less than 1 MB");
    assert_eq!(std::fs::read_dir(h.storage.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_analyzer_failure_is_sanitized() {
    let h = harness(Behaviour::FailWithPath, 1000);

    let (_, body) = send(&h.router, multipart_request("clip.mp4", b"short video")).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let status = wait_for_status(&h.router, &job_id, "error").await;
    let message = status["error"].as_str().unwrap();
    assert!(message.starts_with("model crashed reading video.mp4"));
    assert!(!message.contains(h.storage.path().to_str().unwrap()));
    assert!(!message.contains("sk-test-abcdefghijkl"));
    assert_eq!(status["progress"], 35);
    assert_eq!(status["current_step"], "Analyzing frames");
}

#[tokio::test]
async fn test_cleanup_while_processing_forgets_the_job() {
    let h = harness(Behaviour::Block, 1000);

    let (_, body) = send(&h.router, multipart_request("clip.mp4", b"short video")).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();
    wait_for_status(&h.router, &job_id, "processing").await;

    let uri = format!("/cleanup/{}", job_id);
    let (code, body) = send(&h.router, empty_request("POST", &uri)).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["message"], "Job cleaned up successfully");

    let (code, _) = send(&h.router, empty_request("GET", &format!("/status/{}", job_id))).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    assert!(!h.storage.path().join(&job_id).exists());

    // Cleaning up again, or an id that never existed, is still fine.
    let (code, _) = send(&h.router, empty_request("POST", &uri)).await;
    assert_eq!(code, StatusCode::OK);
    let (code, _) = send(&h.router, empty_request("POST", "/cleanup/not-a-job")).await;
    assert_eq!(code, StatusCode::OK);
}

#[tokio::test]
async fn test_fast_polling_is_rate_limited() {
    let h = harness(Behaviour::Block, 1);

    let (_, body) = send(&h.router, multipart_request("clip.mp4", b"short video")).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();
    let uri = format!("/status/{}", job_id);

    let mut limited = false;
    for _ in 0..10 {
        let (code, _) = send(&h.router, empty_request("GET", &uri)).await;
        if code == StatusCode::TOO_MANY_REQUESTS {
            limited = true;
            break;
        }
    }
    assert!(limited);

    h.app.shutdown().await;
}

#[tokio::test]
async fn test_unknown_job_status_is_not_found() {
    let h = harness(Behaviour::Clean, 1000);

    let (code, body) = send(&h.router, empty_request("GET", "/status/not-a-uuid")).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (code, body) = send(&h.router, empty_request("GET", "/health")).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["jobs"].is_number());
}

#[tokio::test]
async fn test_shutdown_removes_job_files() {
    let h = harness(Behaviour::Block, 1000);

    let (_, body) = send(&h.router, multipart_request("clip.mp4", b"short video")).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();
    wait_for_status(&h.router, &job_id, "processing").await;

    h.app.shutdown().await;
    assert!(h.app.registry().is_empty());
    assert!(!h.storage.path().join(&job_id).exists());
}
