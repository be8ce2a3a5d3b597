#![cfg_attr(feature = "strict", deny(warnings))]

pub use config::{
    RetryConfig, UploadSessionConfig, DEFAULT_CONCURRENT_PART_UPLOADS, DEFAULT_CONTENT_TYPE,
    DEFAULT_UPLOAD_BLOCK_SIZE,
};
pub use coordinator::CoordinatorClient;
pub use error::{ApiErrorKind, Result, TransientPartError, UploadClientError};
pub use http_client::{build_auth_http_client, build_http_client, AuthConfig, AuthMiddleware};
pub use part_planner::{plan_parts, PartTask};
pub use part_uploader::PartUploader;
pub use upload_session::SourceUploadSession;

mod config;
mod coordinator;
mod error;
mod http_client;
mod part_planner;
mod part_upload_stream;
mod part_uploader;
mod upload_session;
