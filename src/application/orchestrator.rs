//! Transcode pipeline: probe, encode renditions, thumbnail, master
//! playlist, then settle the video row and bill the owner.

use crate::application::billing::BillingService;
use crate::application::worker::JobHandler;
use crate::domain::hls::MasterPlaylist;
use crate::domain::jobs::TranscodeJob;
use crate::domain::video::{select_renditions, Video};
use crate::media::{self, MediaError, TranscodeRunner};
use crate::ports::repository::{
    BillingStore, ProcessingClaim, StoreError, TranscodeOutcome, VideoRepository,
};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("video {0} does not exist")]
    UnknownVideo(Uuid),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Runs one transcode job end to end.
///
/// Safe under at-least-once delivery: the processing claim and the
/// conditional completion both go through the repository, and billing
/// only happens when this delivery's completion wins.
pub struct TranscodeOrchestrator<R, B> {
    repo: Arc<R>,
    billing: BillingService<B>,
    runner: Arc<dyn TranscodeRunner>,
    processed_dir: PathBuf,
}

impl<R: VideoRepository, B: BillingStore> TranscodeOrchestrator<R, B> {
    pub fn new(
        repo: Arc<R>,
        billing: BillingService<B>,
        runner: Arc<dyn TranscodeRunner>,
        processed_dir: PathBuf,
    ) -> Self {
        Self {
            repo,
            billing,
            runner,
            processed_dir,
        }
    }

    pub async fn run(&self, job: &TranscodeJob) -> Result<(), PipelineError> {
        let video = self
            .repo
            .get(job.video_id)
            .await?
            .ok_or(PipelineError::UnknownVideo(job.video_id))?;

        match self.repo.begin_processing(video.id).await? {
            ProcessingClaim::Claimed => {}
            ProcessingClaim::AlreadyCompleted => {
                info!(video = %video.id, "already completed, skipping redelivery");
                return Ok(());
            }
        }

        match self.process(&video, job).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Err(store_err) = self.repo.mark_failed(video.id).await {
                    warn!(video = %video.id, error = %store_err, "could not mark video failed");
                }
                Err(e)
            }
        }
    }

    async fn process(&self, video: &Video, job: &TranscodeJob) -> Result<(), PipelineError> {
        if !job.source_path.is_file() {
            return Err(MediaError::SourceMissing(job.source_path.clone()).into());
        }

        let info = media::probe(self.runner.as_ref(), &job.source_path).await?;
        let renditions = select_renditions(info.width, info.height);
        info!(
            video = %video.id,
            resolution = %info.resolution(),
            duration = info.duration_seconds,
            renditions = renditions.len(),
            "source probed"
        );

        let out_dir = self.processed_dir.join(video.id.to_string());
        tokio::fs::create_dir_all(&out_dir).await?;

        let thumbnail = async {
            match &job.thumbnail_path {
                Some(provided) => Ok(provided.to_string_lossy().into_owned()),
                None => {
                    media::thumbnail::extract(
                        self.runner.as_ref(),
                        &job.source_path,
                        &out_dir,
                        info.duration_seconds,
                    )
                    .await?;
                    Ok(public_path(video.id, media::thumbnail::THUMBNAIL_FILE_NAME))
                }
            }
        };
        let encodes = try_join_all(renditions.iter().map(|rendition| {
            media::encode_rendition(self.runner.as_ref(), &job.source_path, &out_dir, rendition)
        }));
        let (thumbnail_path, _): (String, Vec<()>) = tokio::try_join!(thumbnail, encodes)?;

        let playlist = MasterPlaylist::for_renditions(&renditions);
        playlist.write_to(&out_dir).await?;

        let outcome = TranscodeOutcome {
            hls_path: public_path(video.id, crate::domain::hls::MASTER_PLAYLIST_NAME),
            thumbnail_path: Some(thumbnail_path),
            duration_seconds: info.duration_seconds.ceil() as u64,
            original_resolution: info.resolution(),
            available_resolutions: renditions.iter().map(|r| r.resolution()).collect(),
        };

        let won = self.repo.complete(video.id, &outcome).await?;
        if won {
            self.billing
                .charge(video.user_id, video.id, info.duration_seconds)
                .await?;
        } else {
            info!(video = %video.id, "completion lost to a concurrent delivery, billing skipped");
        }

        if let Err(e) = tokio::fs::remove_file(&job.source_path).await {
            warn!(video = %video.id, error = %e, "could not remove source file");
        }

        info!(video = %video.id, hls = %outcome.hls_path, "transcode finished");
        Ok(())
    }
}

fn public_path(video_id: Uuid, file: &str) -> String {
    format!("/processed/{video_id}/{file}")
}

#[async_trait]
impl<R, B> JobHandler for TranscodeOrchestrator<R, B>
where
    R: VideoRepository + 'static,
    B: BillingStore + 'static,
{
    async fn handle(
        &self,
        payload: &serde_json::Value,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let job: TranscodeJob = serde_json::from_value(payload.clone())?;
        self.run(&job).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testutil::{MemoryBilling, MemoryRepo};
    use crate::domain::video::VideoStatus;
    use crate::media::MockTranscodeRunner;
    use rust_decimal::Decimal;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};

    const PROBE_720P: &str = r#"{
        "streams": [
            {"codec_type": "video", "width": 1280, "height": 720},
            {"codec_type": "audio"}
        ],
        "format": {"duration": "125.048000"}
    }"#;

    fn ok_output(stdout: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(0),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }

    fn failed_output(stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(256),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    struct Fixture {
        repo: Arc<MemoryRepo>,
        billing_store: Arc<MemoryBilling>,
        orchestrator: TranscodeOrchestrator<MemoryRepo, MemoryBilling>,
        processed_dir: tempfile::TempDir,
        source_dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new(runner: MockTranscodeRunner) -> Self {
            let repo = Arc::new(MemoryRepo::new());
            let billing_store = Arc::new(MemoryBilling::new());
            let processed_dir = tempfile::tempdir().unwrap();
            let source_dir = tempfile::tempdir().unwrap();
            let orchestrator = TranscodeOrchestrator::new(
                Arc::clone(&repo),
                BillingService::new(Arc::clone(&billing_store), d("0.50")),
                Arc::new(runner),
                processed_dir.path().to_path_buf(),
            );
            Self {
                repo,
                billing_store,
                orchestrator,
                processed_dir,
                source_dir,
            }
        }

        async fn uploaded_video(&self) -> (Video, TranscodeJob) {
            let source = self.source_dir.path().join("upload.mp4");
            std::fs::write(&source, b"not really mp4").unwrap();
            let video = Video::new(7, "clip", source.clone());
            self.repo.create(&video).await.unwrap();
            let job = TranscodeJob {
                video_id: video.id,
                source_path: source,
                thumbnail_path: None,
            };
            (video, job)
        }
    }

    fn happy_runner() -> MockTranscodeRunner {
        let mut runner = MockTranscodeRunner::new();
        runner
            .expect_run_ffprobe()
            .returning(|_| Ok(ok_output(PROBE_720P)));
        runner.expect_run_ffmpeg().returning(|_| Ok(ok_output("")));
        runner
    }

    #[tokio::test]
    async fn successful_run_completes_bills_and_removes_source() {
        let fx = Fixture::new(happy_runner());
        let (video, job) = fx.uploaded_video().await;

        fx.orchestrator.run(&job).await.unwrap();

        let stored = fx.repo.get(video.id).await.unwrap().unwrap();
        assert_eq!(stored.status, VideoStatus::Completed);
        assert_eq!(
            stored.hls_path.as_deref(),
            Some(format!("/processed/{}/master.m3u8", video.id).as_str())
        );
        assert_eq!(
            stored.thumbnail_path.as_deref(),
            Some(format!("/processed/{}/thumbnail.jpg", video.id).as_str())
        );
        // Probed 125.048s, displayed as the next whole second.
        assert_eq!(stored.duration, Some(126));
        assert_eq!(stored.original_resolution.as_deref(), Some("1280x720"));
        assert_eq!(stored.available_resolutions, vec!["640x360"]);
        assert!(stored.file_path.is_none());
        assert!(!job.source_path.exists());

        let master = fx
            .processed_dir
            .path()
            .join(video.id.to_string())
            .join("master.m3u8");
        let body = std::fs::read_to_string(master).unwrap();
        assert!(body.contains("BANDWIDTH=800000,RESOLUTION=640x360"));

        let records = fx.billing_store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, 7);
        // 125.048s rounds up to 3 minutes at $0.50/min.
        assert_eq!(records[0].amount, d("1.50"));
    }

    #[tokio::test]
    async fn redelivered_job_for_completed_video_does_not_bill_again() {
        let fx = Fixture::new(happy_runner());
        let (_, job) = fx.uploaded_video().await;

        fx.orchestrator.run(&job).await.unwrap();
        fx.orchestrator.run(&job).await.unwrap();

        assert_eq!(fx.billing_store.records().len(), 1);
    }

    #[tokio::test]
    async fn caller_supplied_thumbnail_skips_extraction() {
        let mut runner = MockTranscodeRunner::new();
        runner
            .expect_run_ffprobe()
            .returning(|_| Ok(ok_output(PROBE_720P)));
        // Only the rendition encode runs; no thumbnail invocation.
        runner
            .expect_run_ffmpeg()
            .times(1)
            .returning(|_| Ok(ok_output("")));

        let fx = Fixture::new(runner);
        let (video, mut job) = fx.uploaded_video().await;
        job.thumbnail_path = Some(PathBuf::from("/uploads/custom.jpg"));

        fx.orchestrator.run(&job).await.unwrap();

        let stored = fx.repo.get(video.id).await.unwrap().unwrap();
        assert_eq!(stored.thumbnail_path.as_deref(), Some("/uploads/custom.jpg"));
    }

    #[tokio::test]
    async fn encode_failure_marks_video_failed_without_billing() {
        let mut runner = MockTranscodeRunner::new();
        runner
            .expect_run_ffprobe()
            .returning(|_| Ok(ok_output(PROBE_720P)));
        runner
            .expect_run_ffmpeg()
            .returning(|_| Ok(failed_output("encoder blew up")));

        let fx = Fixture::new(runner);
        let (video, job) = fx.uploaded_video().await;

        let err = fx.orchestrator.run(&job).await.unwrap_err();
        assert!(matches!(err, PipelineError::Media(_)));

        let stored = fx.repo.get(video.id).await.unwrap().unwrap();
        assert_eq!(stored.status, VideoStatus::Failed);
        assert!(fx.billing_store.records().is_empty());
        // The source stays for the retry.
        assert!(job.source_path.exists());
    }

    #[tokio::test]
    async fn missing_source_fails_before_probing() {
        let runner = MockTranscodeRunner::new();
        let fx = Fixture::new(runner);
        let (video, mut job) = fx.uploaded_video().await;
        job.source_path = PathBuf::from("/nowhere/gone.mp4");

        let err = fx.orchestrator.run(&job).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Media(MediaError::SourceMissing(_))
        ));

        let stored = fx.repo.get(video.id).await.unwrap().unwrap();
        assert_eq!(stored.status, VideoStatus::Failed);
    }

    #[tokio::test]
    async fn unknown_video_id_is_an_error() {
        let fx = Fixture::new(MockTranscodeRunner::new());
        let job = TranscodeJob {
            video_id: Uuid::new_v4(),
            source_path: PathBuf::from("/tmp/x.mp4"),
            thumbnail_path: None,
        };

        let err = fx.orchestrator.run(&job).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownVideo(_)));
    }
}
