use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A 1-based part number within a multipart upload.
pub type PartNumber = u32;

/// Identifies a video on the coordination service.  The service issues these;
/// the engine treats them as opaque.
#[derive(Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VideoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VideoId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Identifies one multipart upload session; issued by the coordination
/// service when a plan is prepared and echoed back on completion.
#[derive(Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(String);

impl UploadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UploadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareUploadRequest {
    pub file_size: u64,
}

/// The upload plan for one source file: the session id, one pre-authorized
/// target per part (index order = part number - 1), the fixed part size, and
/// the storage key the merged object will live under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareUploadResponse {
    pub upload_id: UploadId,
    pub urls: Vec<String>,
    pub part_size: u64,
    pub key: String,
}

/// A part that finished uploading: its number plus the checksum the storage
/// target returned.  Referencing a part in the completion manifest requires
/// both.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: PartNumber,
    pub etag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteUploadRequest {
    pub upload_id: UploadId,
    pub parts: Vec<CompletedPart>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_upload_wire_format() {
        // Field names follow the coordination service's snake_case contract.
        let plan: PrepareUploadResponse = serde_json::from_str(
            r#"{
                "upload_id": "u-123",
                "urls": ["https://storage.example/p/1", "https://storage.example/p/2"],
                "part_size": 5000000,
                "key": "videos/v-1/source"
            }"#,
        )
        .unwrap();

        assert_eq!(plan.upload_id, UploadId::new("u-123"));
        assert_eq!(plan.urls.len(), 2);
        assert_eq!(plan.part_size, 5_000_000);
        assert_eq!(plan.key, "videos/v-1/source");
    }

    #[test]
    fn test_complete_upload_wire_format() {
        let req = CompleteUploadRequest {
            upload_id: UploadId::new("u-123"),
            parts: vec![
                CompletedPart {
                    part_number: 1,
                    etag: "abc".to_owned(),
                },
                CompletedPart {
                    part_number: 2,
                    etag: "def".to_owned(),
                },
            ],
        };

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["upload_id"], "u-123");
        assert_eq!(value["parts"][0]["part_number"], 1);
        assert_eq!(value["parts"][1]["etag"], "def");
    }
}
