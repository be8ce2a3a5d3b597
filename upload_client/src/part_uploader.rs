use std::sync::Arc;

use bytes::Bytes;
use progress_tracking::PartProgressTracker;
use reqwest::header::{CONTENT_TYPE, ETAG};
use reqwest_middleware::ClientWithMiddleware;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use upload_types::CompletedPart;

use crate::config::RetryConfig;
use crate::error::{ApiErrorKind, Result, TransientPartError, UploadClientError};
use crate::part_planner::PartTask;
use crate::part_upload_stream::PartUploadStream;

/// Uploads all planned parts of one source, keeping at most a fixed number
/// in flight and retrying each part independently.
pub struct PartUploader {
    tracker: Arc<PartProgressTracker>,

    // The semaphore is fair, so parts are admitted in plan order.
    parallel_upload_limiter: Arc<Semaphore>,

    attempt_context: PartAttemptContext,
}

impl PartUploader {
    pub fn new(
        client: ClientWithMiddleware,
        tracker: Arc<PartProgressTracker>,
        concurrent_parts: usize,
        content_type: &str,
        retry: RetryConfig,
        block_size: u64,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            tracker: tracker.clone(),
            parallel_upload_limiter: Arc::new(Semaphore::new(concurrent_parts.max(1))),
            attempt_context: PartAttemptContext {
                client,
                tracker,
                content_type: content_type.to_owned(),
                retry,
                block_size,
                cancellation,
            },
        }
    }

    /// Runs every part to a terminal state.
    ///
    /// Succeeds only if every part succeeds; the first part to exhaust its
    /// retry budget fails the whole operation, and any parts still in flight
    /// are dropped with the set.  The returned results are sorted ascending
    /// by part number, independent of completion order.
    pub async fn upload_parts(&self, source: &Bytes, tasks: Vec<PartTask>) -> Result<Vec<CompletedPart>> {
        let mut upload_tasks: JoinSet<Result<CompletedPart>> = JoinSet::new();
        let mut completed = Vec::with_capacity(tasks.len());

        for task in tasks {
            // The permit is acquired before spawning and released when the
            // part reaches a terminal state, which bounds the in-flight set.
            let permit = tokio::select! {
                _ = self.attempt_context.cancellation.cancelled() => return Err(UploadClientError::Cancelled),
                permit = self.parallel_upload_limiter.clone().acquire_owned() => permit?,
            };

            let context = self.attempt_context.clone();
            let data = source.slice(task.byte_range.start as usize..task.byte_range.end as usize);

            upload_tasks.spawn(async move {
                let result = context.upload_part(&task, data).await;
                drop(permit);
                result
            });

            // Surface a part that already failed terminally instead of
            // admitting the rest.
            while let Some(result) = upload_tasks.try_join_next() {
                completed.push(result??);
            }
        }

        while let Some(result) = upload_tasks.join_next().await {
            completed.push(result??);
        }

        completed.sort_by_key(|p| p.part_number);

        let (done, total) = self.tracker.status().await;
        debug!(done, total, n_parts = completed.len(), "all parts uploaded");

        Ok(completed)
    }
}

/// Everything one part's upload attempts need; cloned into each part task.
#[derive(Clone)]
struct PartAttemptContext {
    client: ClientWithMiddleware,
    tracker: Arc<PartProgressTracker>,
    content_type: String,
    retry: RetryConfig,
    block_size: u64,
    cancellation: CancellationToken,
}

impl PartAttemptContext {
    /// Uploads one part, retrying transient failures with doubling backoff
    /// until the budget is exhausted.
    async fn upload_part(&self, task: &PartTask, data: Bytes) -> Result<CompletedPart> {
        let part_number = task.part_number;
        let part_index = (part_number - 1) as usize;
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            // Every attempt restarts the part's counted bytes from zero.
            self.tracker.reset_part(part_index).await;

            let attempt_result = tokio::select! {
                _ = self.cancellation.cancelled() => return Err(UploadClientError::Cancelled),
                result = self.transfer_once(task, data.clone()) => result,
            };

            match attempt_result {
                Ok(etag) => {
                    self.tracker.register_part_completion(part_index).await;
                    debug!(part_number, attempt, "part uploaded");
                    return Ok(CompletedPart { part_number, etag });
                },
                Err(transient) => {
                    warn!(part_number, attempt, error = %transient, "part upload attempt failed");

                    if attempt == max_attempts {
                        return Err(UploadClientError::ExhaustedPart {
                            part_number,
                            attempts: max_attempts,
                            last: transient,
                        });
                    }

                    let backoff = self.retry.backoff_base * (1u32 << (attempt - 1).min(16));
                    tokio::select! {
                        _ = self.cancellation.cancelled() => return Err(UploadClientError::Cancelled),
                        _ = tokio::time::sleep(backoff) => {},
                    }
                },
            }
        }

        unreachable!("attempt loop exits via return");
    }

    /// One raw byte-range transfer to the part's target.  Returns the
    /// checksum the storage target handed back, with surrounding quotes
    /// stripped.
    async fn transfer_once(&self, task: &PartTask, data: Bytes) -> std::result::Result<String, TransientPartError> {
        let part_index = (task.part_number - 1) as usize;

        let tracker = self.tracker.clone();
        let body = PartUploadStream::new(data, self.block_size, move |n_bytes| {
            tracker.register_part_progress_background(part_index, n_bytes);
        });

        let response = self
            .client
            .put(task.target.clone())
            .header(CONTENT_TYPE, self.content_type.as_str())
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransientPartError::Rejected {
                kind: ApiErrorKind::classify(status),
            });
        }

        // A success response without a checksum cannot be referenced in the
        // completion manifest, so it counts as a failed attempt.
        let Some(etag) = response.headers().get(ETAG) else {
            return Err(TransientPartError::MissingChecksum);
        };
        let etag = etag.to_str().map_err(|_| TransientPartError::MissingChecksum)?;

        Ok(etag.trim_matches('"').to_owned())
    }
}
