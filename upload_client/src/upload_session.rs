use std::sync::Arc;

use bytes::Bytes;
use progress_tracking::{PartProgressTracker, TrackingProgressUpdater};
use reqwest_middleware::ClientWithMiddleware;
use tokio_util::sync::CancellationToken;
use tracing::info;
use upload_types::VideoId;

use crate::config::{UploadSessionConfig, DEFAULT_CONTENT_TYPE};
use crate::coordinator::CoordinatorClient;
use crate::error::{Result, UploadClientError};
use crate::http_client::build_http_client;
use crate::part_planner::plan_parts;
use crate::part_uploader::PartUploader;

/// The source-upload engine: plans a multipart session against the
/// coordination service, uploads all parts with bounded concurrency, and
/// finalizes the transfer.
///
/// A session holds no per-attempt state; every `upload_source` call builds a
/// fresh plan and progress tracker, and either fully succeeds or fails with
/// one classified error.  Once the session's cancellation token fires, the
/// session stays cancelled; start a new session for another go.
pub struct SourceUploadSession {
    coordinator: CoordinatorClient,
    transfer_client: ClientWithMiddleware,
    config: UploadSessionConfig,
    progress_updater: Arc<dyn TrackingProgressUpdater>,
    cancellation: CancellationToken,
}

impl SourceUploadSession {
    pub fn new(config: UploadSessionConfig, progress_updater: Arc<dyn TrackingProgressUpdater>) -> Result<Arc<Self>> {
        let coordinator = CoordinatorClient::new(&config.endpoint, &config.auth)?;
        let transfer_client = build_http_client()?;

        Ok(Arc::new(Self {
            coordinator,
            transfer_client,
            config,
            progress_updater,
            cancellation: CancellationToken::new(),
        }))
    }

    /// Handle for aborting in-flight transfers; triggering it makes the
    /// active attempt surface [`UploadClientError::Cancelled`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Uploads `source` as the video's content.
    ///
    /// Requests a plan, uploads every part, emits the forced 100% signal,
    /// and submits the part manifest.  The coordinator is never asked to
    /// merge unless every part succeeded, so a failed attempt leaves no
    /// addressable partial object behind.
    pub async fn upload_source(&self, video_id: &VideoId, source: Bytes, content_type: Option<&str>) -> Result<()> {
        let file_size = source.len() as u64;
        if file_size == 0 {
            return Err(UploadClientError::InvalidArguments);
        }

        let plan = self.coordinator.init_upload(video_id, file_size).await?;
        let tasks = plan_parts(file_size, plan.part_size, &plan.urls)?;

        let part_sizes: Vec<u64> = tasks.iter().map(|t| t.expected_bytes()).collect();
        let tracker = Arc::new(PartProgressTracker::new(&part_sizes, self.progress_updater.clone()));

        let uploader = PartUploader::new(
            self.transfer_client.clone(),
            tracker.clone(),
            self.config.concurrent_parts,
            content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
            self.config.retry.clone(),
            self.config.block_size,
            self.cancellation.clone(),
        );

        let completed_parts = uploader.upload_parts(&source, tasks).await?;

        // The forced completion signal goes out after the last part and
        // before the coordinator is asked to merge, so observers see 100
        // exactly once and ahead of finalization.
        tracker.register_finalization().await;

        self.coordinator.complete_upload(video_id, plan.upload_id, completed_parts).await?;

        info!(%video_id, file_size, "source upload finished");
        Ok(())
    }
}
