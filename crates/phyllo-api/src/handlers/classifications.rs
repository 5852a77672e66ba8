use crate::auth::models::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::ingestion::image_url;
use crate::state::{ClassificationState, StorageState};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use phyllo_core::models::{ClassificationRecord, ClassificationUpdate};
use phyllo_core::{AppError, StorageTier};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// A stored classification with the URL its image is served from.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationView {
    #[serde(flatten)]
    pub classification: ClassificationRecord,
    pub image_url: String,
    pub storage_type: StorageTier,
}

impl ClassificationView {
    fn new(storage: &StorageState, classification: ClassificationRecord) -> Self {
        ClassificationView {
            image_url: image_url(
                storage.object_store.as_ref(),
                classification.storage_tier,
                &classification.image_path,
            ),
            storage_type: classification.storage_tier,
            classification,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClassificationListResponse {
    pub count: i64,
    pub pages: i64,
    pub results: Vec<ClassificationView>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Records are visible to their owner and to admins. Anyone else gets a 404.
fn visible_to(record: &ClassificationRecord, user: &AuthUser) -> bool {
    user.is_admin() || record.user_id == user.id
}

#[utoipa::path(
    get,
    path = "/classifications/{id}",
    tag = "classifications",
    params(("id" = Uuid, Path, description = "Classification ID")),
    responses(
        (status = 200, description = "Classification found", body = ClassificationView),
        (status = 404, description = "Classification not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(storage, classifications),
    fields(user_id = %user.id, classification_id = %id, operation = "get_classification")
)]
pub async fn get_classification(
    Path(id): Path<Uuid>,
    State(storage): State<StorageState>,
    State(classifications): State<ClassificationState>,
    user: AuthUser,
) -> Result<Json<ClassificationView>, HttpAppError> {
    let record = classifications
        .records
        .find_by_id(id)
        .await?
        .filter(|record| visible_to(record, &user))
        .ok_or_else(|| AppError::NotFound("Classification not found".to_string()))?;

    Ok(Json(ClassificationView::new(&storage, record)))
}

#[utoipa::path(
    get,
    path = "/classifications",
    tag = "classifications",
    params(ListQuery),
    responses(
        (status = 200, description = "The caller's classifications, newest first", body = ClassificationListResponse),
        (status = 400, description = "Invalid pagination", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(storage, classifications),
    fields(user_id = %user.id, operation = "list_classifications")
)]
pub async fn list_classifications(
    Query(query): Query<ListQuery>,
    State(storage): State<StorageState>,
    State(classifications): State<ClassificationState>,
    user: AuthUser,
) -> Result<Json<ClassificationListResponse>, HttpAppError> {
    if query.page < 1 {
        return Err(AppError::InvalidInput("page must be at least 1".to_string()).into());
    }
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let offset = (query.page - 1)
        .checked_mul(limit)
        .ok_or_else(|| AppError::InvalidInput("page is out of range".to_string()))?;

    let page = classifications
        .records
        .list_by_user(&user.id, limit, offset)
        .await?;

    Ok(Json(ClassificationListResponse {
        count: page.total,
        pages: (page.total + limit - 1) / limit,
        results: page
            .items
            .into_iter()
            .map(|record| ClassificationView::new(&storage, record))
            .collect(),
    }))
}

#[utoipa::path(
    patch,
    path = "/classifications/{id}",
    tag = "classifications",
    params(("id" = Uuid, Path, description = "Classification ID")),
    request_body = ClassificationUpdate,
    responses(
        (status = 200, description = "Classification updated", body = ClassificationView),
        (status = 400, description = "Empty or invalid update", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Classification not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(storage, classifications, update),
    fields(user_id = %user.id, classification_id = %id, operation = "update_classification")
)]
pub async fn update_classification(
    Path(id): Path<Uuid>,
    State(storage): State<StorageState>,
    State(classifications): State<ClassificationState>,
    user: AuthUser,
    ValidatedJson(update): ValidatedJson<ClassificationUpdate>,
) -> Result<Json<ClassificationView>, HttpAppError> {
    user.require_admin()?;

    if update.is_empty() {
        return Err(AppError::InvalidInput("No fields to update".to_string()).into());
    }
    let blank = |value: &Option<String>| value.as_deref().is_some_and(|v| v.trim().is_empty());
    if blank(&update.species) || blank(&update.shape) {
        return Err(
            AppError::InvalidInput("species and shape cannot be empty".to_string()).into(),
        );
    }

    let record = classifications
        .records
        .update(id, update)
        .await?
        .ok_or_else(|| AppError::NotFound("Classification not found".to_string()))?;

    tracing::info!(status = %record.status, is_archived = record.is_archived, "Classification updated");

    Ok(Json(ClassificationView::new(&storage, record)))
}
