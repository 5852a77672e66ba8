use crate::auth::models::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::ClassificationState;
use crate::utils::upload::{extract_image_field, validate_image, UploadLimits};
use axum::{
    extract::{Multipart, State},
    Json,
};
use phyllo_core::models::ClassificationRecord;
use phyllo_core::StorageTier;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub classification: ClassificationRecord,
    pub image_url: String,
    pub storage_type: StorageTier,
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "classifications",
    request_body(content_type = "multipart/form-data", description = "Leaf image in the `image` field"),
    responses(
        (status = 200, description = "Image classified and stored", body = UploadResponse),
        (status = 400, description = "No image, invalid file or not a plant", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage or persistence failure", body = ErrorResponse),
        (status = 502, description = "Classifier returned an invalid response", body = ErrorResponse),
        (status = 503, description = "Classifier unavailable", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(classifications, limits, multipart),
    fields(user_id = %user.id, operation = "upload_image")
)]
pub async fn upload_image(
    State(classifications): State<ClassificationState>,
    State(limits): State<UploadLimits>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let image = extract_image_field(multipart).await?;
    let image = validate_image(image, &limits)?;

    tracing::debug!(
        filename = %image.filename,
        content_type = %image.content_type,
        size_bytes = image.data.len(),
        "Upload accepted for classification"
    );

    let success = classifications.ingestion.ingest(&user.id, image).await?;

    Ok(Json(UploadResponse {
        classification: success.record,
        image_url: success.image_url,
        storage_type: success.storage_tier,
    }))
}
