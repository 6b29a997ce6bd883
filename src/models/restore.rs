use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RestoreResponse {
    pub restored: String,
    pub photo_credits: i32,
}

/// Multipart body of `POST /api/restore`, for the OpenAPI document only.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct RestoreUpload {
    #[schema(value_type = String, format = Binary)]
    pub photo: Vec<u8>,
}

/// An upload accepted by the restore endpoint, held in memory until a credit
/// has been consumed.
#[derive(Debug, Clone)]
pub struct UploadedPhoto {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}
