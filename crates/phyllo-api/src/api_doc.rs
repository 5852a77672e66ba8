//! OpenAPI documentation, served at `/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use phyllo_core::models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Phyllo API",
        version = "0.1.0",
        description = "Leaf image intake: classifies uploaded leaf photos, stores the image and keeps one classification record per upload."
    ),
    paths(
        handlers::upload::upload_image,
        handlers::classifications::get_classification,
        handlers::classifications::list_classifications,
        handlers::classifications::update_classification,
    ),
    components(
        schemas(
            models::ClassificationRecord,
            models::ClassificationUpdate,
            models::VerificationStatus,
            phyllo_core::StorageTier,
            handlers::upload::UploadResponse,
            handlers::classifications::ClassificationView,
            handlers::classifications::ClassificationListResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "classifications", description = "Leaf image upload and classification records")
    )
)]
pub struct ApiDoc;

pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
