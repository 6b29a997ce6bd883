use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    middleware::AuthenticatedUser,
    models::{RestoreResponse, UploadedPhoto},
    utils::file,
};

pub const PHOTO_FIELD: &str = "photo";

fn multipart_error(error: MultipartError) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge
    } else {
        AppError::Validation(error.body_text())
    }
}

async fn read_photo(multipart: &mut Multipart, max_file_size: usize) -> Result<UploadedPhoto> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?;

        if data.is_empty() {
            return Err(AppError::MissingFile);
        }
        if data.len() > max_file_size {
            return Err(AppError::FileTooLarge);
        }

        return Ok(UploadedPhoto {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    Err(AppError::MissingFile)
}

/// Stores the upload, hands its public URL to the restorer and returns the
/// URL the client should show.
async fn run_restoration(state: &AppState, photo: &UploadedPhoto) -> Result<String> {
    let upload_name = file::upload_file_name(&photo.file_name, Utc::now().timestamp_millis());
    state.uploads.store_bytes(&upload_name, &photo.data).await?;
    let image_url = state.uploads.public_url(&upload_name);

    let output_url = state.restorer.restore(&image_url).await?;
    if !state.config.persist_restored {
        return Ok(output_url);
    }

    let restored = state.restorer.download(&output_url).await?;
    let restored_name = file::restored_file_name(&upload_name);
    state.uploads.store_bytes(&restored_name, &restored).await?;

    Ok(state.uploads.public_url(&restored_name))
}

#[utoipa::path(
    post,
    path = "/api/restore",
    tag = "restore",
    request_body(content = crate::models::RestoreUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Restored image URL and remaining credits", body = RestoreResponse),
        (status = 400, description = "No file or not an image"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "No photo credits remaining"),
        (status = 413, description = "File too large"),
        (status = 500, description = "Restoration failed")
    )
)]
pub async fn restore(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<RestoreResponse>> {
    let photo = read_photo(&mut multipart, state.config.max_file_size).await?;
    let declared_type = Some(photo.content_type.as_str()).filter(|ct| !ct.is_empty());
    file::validate_image_upload(&photo.file_name, declared_type, &photo.data)?;

    let Some(remaining) = state.store.consume_credit(auth.id).await? else {
        tracing::info!(user_id = %auth.id, "Restore denied, no credits left");
        state.metrics.record_restoration("denied");
        return Err(AppError::NoCredits);
    };
    state.metrics.record_credit_consumed();

    match run_restoration(&state, &photo).await {
        Ok(restored) => {
            state.metrics.record_restoration("success");
            tracing::info!(user_id = %auth.id, photo_credits = remaining, restored = %restored, "Photo restored");

            Ok(Json(RestoreResponse {
                restored,
                photo_credits: remaining,
            }))
        }
        Err(error) => {
            state.metrics.record_restoration("failed");

            if state.config.refund_failed_restores {
                match state.store.refund_credit(auth.id).await {
                    Ok(balance) => {
                        state.metrics.record_credit_refunded();
                        tracing::info!(user_id = %auth.id, photo_credits = balance, "Credit refunded after failed restoration");
                    }
                    Err(refund_error) => {
                        tracing::error!(user_id = %auth.id, "Failed to refund credit: {}", refund_error);
                    }
                }
            }

            Err(error)
        }
    }
}
