use anyhow::anyhow;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::AcquireError;
use tokio::task::JoinError;
use upload_types::PartNumber;

/// The closed classification of coordination/storage HTTP failures.
///
/// Transport statuses are folded into this set in [`ApiErrorKind::classify`]
/// and nowhere else; the rest of the engine only ever sees these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    NotFound,
    Unauthorized,
    Validation,
    Server,
    Unknown,
}

impl ApiErrorKind {
    pub fn classify(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => ApiErrorKind::NotFound,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiErrorKind::Unauthorized,
            StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiErrorKind::Validation
            },
            s if s.is_server_error() => ApiErrorKind::Server,
            _ => ApiErrorKind::Unknown,
        }
    }
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ApiErrorKind::NotFound => "not found",
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::Validation => "validation",
            ApiErrorKind::Server => "server error",
            ApiErrorKind::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// A single failed upload attempt for one part.  Recovered locally by the
/// part's retry budget; surfaces to callers only inside
/// [`UploadClientError::ExhaustedPart`].
#[derive(Error, Debug)]
pub enum TransientPartError {
    #[error("transfer rejected ({kind})")]
    Rejected { kind: ApiErrorKind },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("storage target returned no checksum")]
    MissingChecksum,
}

impl From<reqwest_middleware::Error> for TransientPartError {
    fn from(value: reqwest_middleware::Error) -> Self {
        TransientPartError::Transport(value.to_string())
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UploadClientError {
    #[error("upload planning failed ({kind}): {message}")]
    Planning { kind: ApiErrorKind, message: String },

    #[error("planned {n_parts} parts but got {n_targets} upload targets")]
    PlanMismatch { n_parts: usize, n_targets: usize },

    #[error("part {part_number} failed after {attempts} attempts: {last}")]
    ExhaustedPart {
        part_number: PartNumber,
        attempts: u32,
        #[source]
        last: TransientPartError,
    },

    #[error("upload finalization rejected ({kind}): {message}")]
    Finalize { kind: ApiErrorKind, message: String },

    #[error("upload cancelled")]
    Cancelled,

    #[error("Invalid Arguments")]
    InvalidArguments,

    #[error("Parse Error: {0}")]
    ParseError(#[from] url::ParseError),

    #[error("ReqwestMiddleware Error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),

    #[error("Reqwest Error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Other Internal Error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, UploadClientError>;

impl PartialEq for UploadClientError {
    fn eq(&self, other: &UploadClientError) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl From<AcquireError> for UploadClientError {
    fn from(value: AcquireError) -> Self {
        UploadClientError::InternalError(anyhow!("{value:?}"))
    }
}

impl From<JoinError> for UploadClientError {
    fn from(value: JoinError) -> Self {
        UploadClientError::InternalError(anyhow!("{value:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ApiErrorKind::classify(StatusCode::NOT_FOUND), ApiErrorKind::NotFound);
        assert_eq!(ApiErrorKind::classify(StatusCode::UNAUTHORIZED), ApiErrorKind::Unauthorized);
        assert_eq!(ApiErrorKind::classify(StatusCode::BAD_REQUEST), ApiErrorKind::Validation);
        assert_eq!(ApiErrorKind::classify(StatusCode::PAYLOAD_TOO_LARGE), ApiErrorKind::Validation);
        assert_eq!(ApiErrorKind::classify(StatusCode::INTERNAL_SERVER_ERROR), ApiErrorKind::Server);
        assert_eq!(ApiErrorKind::classify(StatusCode::SERVICE_UNAVAILABLE), ApiErrorKind::Server);
        assert_eq!(ApiErrorKind::classify(StatusCode::IM_A_TEAPOT), ApiErrorKind::Unknown);
    }

    #[test]
    fn test_error_equality_ignores_payload() {
        let a = UploadClientError::Planning {
            kind: ApiErrorKind::Server,
            message: "a".to_owned(),
        };
        let b = UploadClientError::Planning {
            kind: ApiErrorKind::Validation,
            message: "b".to_owned(),
        };

        assert_eq!(a, b);
        assert_ne!(a, UploadClientError::Cancelled);
    }
}
