//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`. Anything that converts into
//! [`AppError`] renders through here with a consistent status, body and log line.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use phyllo_core::{AppError, ErrorMetadata, LogLevel};
use phyllo_services::InferenceError;
use phyllo_storage::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Human-readable description. Carries only the client-safe text in
    /// production or for sensitive errors.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
///
/// `AppError` lives in phyllo-core, so the orphan rule keeps us from implementing
/// axum's `IntoResponse` on it directly.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app_error = match err {
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => {
                AppError::Internal(format!("Storage configuration error: {}", msg))
            }
            other => AppError::Storage(other.to_string()),
        };
        HttpAppError(app_error)
    }
}

impl From<InferenceError> for HttpAppError {
    fn from(err: InferenceError) -> Self {
        let app_error = match err {
            InferenceError::Unavailable(msg) => AppError::InferenceUnavailable(msg),
            InferenceError::MalformedResponse(msg) => AppError::InferenceMalformed(msg),
        };
        HttpAppError(app_error)
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// `Json<T>` that rejects bad bodies with our [`ErrorResponse`] shape.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl HttpAppError {
    fn body(&self, is_production: bool) -> ErrorResponse {
        let app_error = &self.0;
        let hide_details = is_production || app_error.is_sensitive();

        ErrorResponse {
            error: app_error.client_message(),
            message: if hide_details {
                app_error.client_message()
            } else {
                app_error.detailed_message()
            },
            error_type: (!hide_details).then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(&self.0);

        (status, Json(self.body(is_production_env()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_plant_body() {
        let body = HttpAppError(AppError::NotAPlant).body(false);
        assert_eq!(body.error, "no_plant");
        assert_eq!(body.code, "NO_PLANT");
        assert!(!body.recoverable);
    }

    #[test]
    fn test_no_image_body() {
        let body = HttpAppError(AppError::NoImageUploaded).body(true);
        assert_eq!(body.error, "no image uploaded");
        assert!(body.error_type.is_none());
    }

    #[test]
    fn test_storage_error_message_visible_outside_production() {
        let err: HttpAppError = StorageError::UploadFailed("AccessDenied".to_string()).into();
        let body = err.body(false);
        assert_eq!(body.error, "Failed to store image");
        assert!(body.message.contains("AccessDenied"));
        assert_eq!(body.error_type.as_deref(), Some("Storage"));
    }

    #[test]
    fn test_production_hides_details() {
        let err: HttpAppError = StorageError::UploadFailed("AccessDenied".to_string()).into();
        let body = err.body(true);
        assert_eq!(body.message, "Failed to store image");
        assert!(body.error_type.is_none());
    }

    #[test]
    fn test_sensitive_errors_hide_details() {
        let err = HttpAppError(AppError::Internal("secret path /etc".to_string()));
        let body = err.body(false);
        assert!(!body.message.contains("/etc"));
    }

    #[test]
    fn test_inference_error_mapping() {
        let err: HttpAppError = InferenceError::Unavailable("refused".to_string()).into();
        assert_eq!(err.0.http_status_code(), 503);
        let err: HttpAppError = InferenceError::MalformedResponse("bad".to_string()).into();
        assert_eq!(err.0.http_status_code(), 502);
    }

    #[test]
    fn test_into_response_status() {
        let response = HttpAppError(AppError::NotFound("gone".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
