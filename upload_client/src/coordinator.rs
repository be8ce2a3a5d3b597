use bytes::Buf;
use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, info, warn};
use upload_types::{CompleteUploadRequest, CompletedPart, PrepareUploadRequest, PrepareUploadResponse, UploadId, VideoId};

use crate::error::{ApiErrorKind, Result, UploadClientError};
use crate::http_client::{build_auth_http_client, AuthConfig};

/// Client for the upload-coordination service: prepares upload plans and
/// merges uploaded parts into the final object.
///
/// Neither call retries.  A planning failure aborts the attempt before any
/// bytes move; a finalization failure is terminal because the part manifest
/// cannot be made valid by resubmitting it.
pub struct CoordinatorClient {
    client: ClientWithMiddleware,
    endpoint: String,
}

impl CoordinatorClient {
    pub fn new(endpoint: &str, auth_config: &Option<AuthConfig>) -> Result<Self> {
        Ok(Self {
            client: build_auth_http_client(auth_config)?,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
        })
    }

    /// Requests an upload plan for a source of `file_size` bytes.
    pub async fn init_upload(&self, video_id: &VideoId, file_size: u64) -> Result<PrepareUploadResponse> {
        let url = Url::parse(&format!("{}/api/videos/{video_id}/upload/init", self.endpoint))?;
        debug!("init_upload: POST to {url} for video {video_id}");

        let response = self
            .client
            .post(url)
            .json(&PrepareUploadRequest { file_size })
            .send()
            .await
            .map_err(|e| {
                warn!("init_upload transport failure: {e}");
                UploadClientError::Planning {
                    kind: ApiErrorKind::Unknown,
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadClientError::Planning {
                kind: ApiErrorKind::classify(status),
                message: format!("coordinator returned {status}"),
            });
        }

        let body = response.bytes().await.map_err(|e| UploadClientError::Planning {
            kind: ApiErrorKind::Unknown,
            message: e.to_string(),
        })?;
        let plan: PrepareUploadResponse =
            serde_json::from_reader(body.reader()).map_err(|e| UploadClientError::Planning {
                kind: ApiErrorKind::Unknown,
                message: format!("malformed plan response: {e}"),
            })?;

        info!(
            upload_id = %plan.upload_id,
            n_parts = plan.urls.len(),
            part_size = plan.part_size,
            "upload plan prepared"
        );

        Ok(plan)
    }

    /// Submits the completion manifest, sorted ascending by part number
    /// regardless of the order parts actually finished in.
    pub async fn complete_upload(
        &self,
        video_id: &VideoId,
        upload_id: UploadId,
        mut parts: Vec<CompletedPart>,
    ) -> Result<()> {
        parts.sort_by_key(|p| p.part_number);
        let n_parts = parts.len();

        let url = Url::parse(&format!("{}/api/videos/{video_id}/upload/complete", self.endpoint))?;
        debug!("complete_upload: POST to {url} for upload {upload_id}");

        let response = self
            .client
            .post(url)
            .json(&CompleteUploadRequest {
                upload_id: upload_id.clone(),
                parts,
            })
            .send()
            .await
            .map_err(|e| UploadClientError::Finalize {
                kind: ApiErrorKind::Unknown,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadClientError::Finalize {
                kind: ApiErrorKind::classify(status),
                message: format!("coordinator returned {status}"),
            });
        }

        info!(%upload_id, n_parts, "multipart upload finalized");
        Ok(())
    }
}
