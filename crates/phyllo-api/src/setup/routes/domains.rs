//! Authenticated route groups.

use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn classification_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(handlers::upload::upload_image))
        .route(
            "/classifications",
            get(handlers::classifications::list_classifications),
        )
        .route(
            "/classifications/{id}",
            get(handlers::classifications::get_classification)
                .patch(handlers::classifications::update_classification),
        )
        .with_state(state)
}
