use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    /// Only present when the content was already stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "File already exists.")]
    pub message: Option<String>,
    /// SHA-256 of the uploaded content, lowercase hex.
    #[schema(example = "6ae8a75555209fd6c44157c0aed8016e763ff435a19cf186f76863140143ff72")]
    pub file_hash: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "File deleted.")]
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
}
