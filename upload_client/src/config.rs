use std::time::Duration;

use crate::http_client::AuthConfig;

/// Default number of parts in flight at once.
pub const DEFAULT_CONCURRENT_PART_UPLOADS: usize = 3;

/// Content type sent with part transfers when the source doesn't declare
/// one.
pub const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

/// Block size for streaming part bodies; small enough that byte-level
/// progress stays responsive.
pub const DEFAULT_UPLOAD_BLOCK_SIZE: u64 = 512 * 1024;

/// Retry budget for a single part.  The wait before attempt n+1 is
/// `backoff_base * 2^(n-1)`.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts per part, including the first.  Must be at least 1.
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles for each attempt after
    /// that.
    pub backoff_base: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Configuration for a source-upload session.
#[derive(Clone, Debug)]
pub struct UploadSessionConfig {
    /// Base URL of the upload-coordination service.
    pub endpoint: String,

    /// Bearer credentials for coordinator calls, if the deployment requires
    /// them.
    pub auth: Option<AuthConfig>,

    /// Maximum number of parts in flight at once.
    pub concurrent_parts: usize,

    pub retry: RetryConfig,

    /// Block size used when streaming part bodies.
    pub block_size: u64,
}

impl UploadSessionConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth: None,
            concurrent_parts: DEFAULT_CONCURRENT_PART_UPLOADS,
            retry: RetryConfig::default(),
            block_size: DEFAULT_UPLOAD_BLOCK_SIZE,
        }
    }
}
