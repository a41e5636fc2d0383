use super::pending::{PendingTrims, PendingUpload};
use super::registry::JobRegistry;
use super::runner::AnalysisRunner;
use super::validator::UploadValidator;
use crate::domain::jobs::{Job, JobFiles, JobId, VIDEO_FILE};
use crate::domain::upload::{RejectReason, UploadOutcome, ValidationOutcome};
use crate::error::{Error, Result};
use crate::ports::storage::StoragePort;
use crate::sanitize::secure_file_name;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;
use tracing::{info, warn};

/// Name of the raw upload inside a job's area until it is validated.
const PARTIAL_FILE: &str = "upload.part";

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("upload exceeds {0} bytes")]
    TooLarge(u64),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Save a `Stream` to a file, refusing to write more than `limit` bytes.
pub async fn stream_to_file<S, E>(
    path: &Path,
    stream: S,
    limit: u64,
) -> std::result::Result<u64, StreamError>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body_with_io_error = stream.map_err(|err| io::Error::new(io::ErrorKind::Other, err));
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);
    let mut limited = tokio::io::AsyncReadExt::take(body_reader, limit + 1);

    let mut file = BufWriter::new(File::create(path).await?);
    let written = tokio::io::copy(&mut limited, &mut file).await?;
    file.flush().await?;

    if written > limit {
        return Err(StreamError::TooLarge(limit));
    }
    Ok(written)
}

/// Turns an uploaded body into either a running job or a pending trim.
pub struct IntakeService {
    storage: Arc<dyn StoragePort>,
    validator: Arc<UploadValidator>,
    registry: Arc<JobRegistry>,
    runner: Arc<AnalysisRunner>,
    pending: Arc<PendingTrims>,
}

impl IntakeService {
    pub fn new(
        storage: Arc<dyn StoragePort>,
        validator: Arc<UploadValidator>,
        registry: Arc<JobRegistry>,
        runner: Arc<AnalysisRunner>,
        pending: Arc<PendingTrims>,
    ) -> Self {
        Self {
            storage,
            validator,
            registry,
            runner,
            pending,
        }
    }

    pub async fn admit<S, E>(&self, file_name: &str, stream: S) -> Result<UploadOutcome>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        UploadValidator::check_file_name(file_name)?;

        let id = JobId::new();
        let area = self.storage.allocate(&id).await?;
        match self.store_and_register(id, &area, file_name, stream).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.registry.delete(&id);
                self.pending.remove(&id);
                if let Err(cleanup) = self.storage.cleanup(&id).await {
                    warn!("Could not remove storage for rejected upload {}: {}", id, cleanup);
                }
                Err(e)
            }
        }
    }

    async fn store_and_register<S, E>(
        &self,
        id: JobId,
        area: &Path,
        file_name: &str,
        stream: S,
    ) -> Result<UploadOutcome>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let partial = area.join(PARTIAL_FILE);
        let limit = self.validator.max_upload_bytes();
        match stream_to_file(&partial, stream, limit).await {
            Ok(bytes) => info!(
                "Received {} ({} bytes) as job {}",
                secure_file_name(file_name),
                bytes,
                id
            ),
            Err(StreamError::TooLarge(limit)) => {
                return Err(RejectReason::too_large(limit).into());
            }
            Err(StreamError::Io(e)) => {
                warn!("Upload for job {} was interrupted: {}", id, e);
                return Err(Error::bad_request("Upload was interrupted"));
            }
        }

        let video = area.join(VIDEO_FILE);
        match self.validator.validate(&partial, file_name).await {
            ValidationOutcome::Rejected(reason) => Err(reason.into()),
            ValidationOutcome::Accepted { duration, .. } => {
                tokio::fs::rename(&partial, &video).await?;
                self.registry
                    .create(Job::new(id, JobFiles::in_area(area), duration))?;
                self.runner.submit(id).await?;
                Ok(UploadOutcome::Started {
                    job_id: id,
                    duration,
                })
            }
            ValidationOutcome::NeedsTrim { duration, .. } => {
                tokio::fs::rename(&partial, &video).await?;
                let relative = self
                    .storage
                    .relative(&video)
                    .ok_or_else(|| Error::internal("upload stored outside storage root"))?;
                self.pending
                    .insert(PendingUpload::new(id, video, relative.clone(), duration));
                info!(
                    "Job {} is {:.1}s long, waiting for the client to accept trimming",
                    id, duration
                );
                Ok(UploadOutcome::NeedsTrim {
                    job_id: id,
                    temp_video_path: relative,
                    original_duration: duration,
                    max_duration: self.validator.max_duration(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::fs::FsAdapter;
    use crate::adapters::local::queue::ChannelQueue;
    use crate::application::testing::{probe_by_contents, IdleAnalyzer};
    use futures::stream;
    use std::fs;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    struct Harness {
        dir: TempDir,
        registry: Arc<JobRegistry>,
        pending: Arc<PendingTrims>,
        intake: IntakeService,
    }

    fn harness(max_upload_bytes: u64) -> Harness {
        let dir = tempdir().unwrap();
        let storage: Arc<dyn StoragePort> = Arc::new(FsAdapter::new(dir.path()));
        let registry = Arc::new(JobRegistry::new());
        let pending = Arc::new(PendingTrims::new());
        let validator = Arc::new(UploadValidator::new(
            Arc::new(probe_by_contents(90.0, 45.0)),
            60.0,
            max_upload_bytes,
        ));
        let runner = Arc::new(AnalysisRunner::new(
            registry.clone(),
            Arc::new(IdleAnalyzer),
            storage.clone(),
            Arc::new(ChannelQueue::unbounded()),
            Duration::from_secs(5),
            Vec::new(),
        ));
        let intake = IntakeService::new(
            storage,
            validator,
            registry.clone(),
            runner,
            pending.clone(),
        );
        Harness {
            dir,
            registry,
            pending,
            intake,
        }
    }

    fn body(data: &'static [u8]) -> impl Stream<Item = std::result::Result<Bytes, io::Error>> {
        stream::iter(vec![Ok::<Bytes, io::Error>(Bytes::from_static(data))])
    }

    fn areas(dir: &TempDir) -> usize {
        fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_stream_to_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test_file.txt");

        let test_data = "Hello, world!";
        let mock_stream = stream::iter(vec![Ok::<Bytes, io::Error>(Bytes::from(test_data))]);

        let written = stream_to_file(&file_path, mock_stream, 1024).await.unwrap();

        assert_eq!(written, test_data.len() as u64);
        let file_contents = fs::read_to_string(file_path).unwrap();
        assert_eq!(file_contents, test_data);
    }

    #[tokio::test]
    async fn test_stream_to_file_error() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test_file.txt");

        let mock_stream = stream::iter(vec![Err("Test error")]);

        let result = stream_to_file(&file_path, mock_stream, 1024).await;

        match result {
            Err(StreamError::Io(e)) => assert_eq!(e.to_string(), "Test error"),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_to_file_stops_past_limit() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test_file.txt");

        let chunks = vec![
            Ok::<Bytes, io::Error>(Bytes::from_static(b"0123456789")),
            Ok(Bytes::from_static(b"0123456789")),
        ];
        let result = stream_to_file(&file_path, stream::iter(chunks), 15).await;

        assert!(matches!(result, Err(StreamError::TooLarge(15))));
    }

    #[tokio::test]
    async fn test_short_upload_starts_job() {
        let h = harness(1024);

        let outcome = h.intake.admit("clip.mp4", body(b"short video")).await.unwrap();

        let UploadOutcome::Started { job_id, duration } = outcome else {
            panic!("expected a started job");
        };
        assert_eq!(duration, 45.0);
        let snapshot = h.registry.get(&job_id).unwrap();
        assert!(snapshot.files.video.exists());
        assert!(!snapshot.files.area.join(PARTIAL_FILE).exists());
        assert!(h.pending.is_empty());
    }

    #[tokio::test]
    async fn test_long_upload_waits_for_trim() {
        let h = harness(1024);

        let outcome = h.intake.admit("clip.mp4", body(b"long video")).await.unwrap();

        let UploadOutcome::NeedsTrim {
            job_id,
            temp_video_path,
            original_duration,
            max_duration,
        } = outcome
        else {
            panic!("expected a pending trim");
        };
        assert_eq!(temp_video_path, format!("{}/video.mp4", job_id));
        assert_eq!(original_duration, 90.0);
        assert_eq!(max_duration, 60.0);
        assert!(!h.registry.contains(&job_id));
        assert!(h.pending.get(&job_id).unwrap().video.exists());
    }

    #[tokio::test]
    async fn test_wrong_extension_stores_nothing() {
        let h = harness(1024);

        let err = h.intake.admit("clip.avi", body(b"short video")).await.unwrap_err();

        assert!(matches!(err, Error::Validation(RejectReason::WrongFormat)));
        assert_eq!(areas(&h.dir), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_removed() {
        let h = harness(4);

        let err = h.intake.admit("clip.mp4", body(b"short video")).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(RejectReason::TooLarge { .. })
        ));
        assert_eq!(areas(&h.dir), 0);
        assert!(h.registry.is_empty());
    }
}
