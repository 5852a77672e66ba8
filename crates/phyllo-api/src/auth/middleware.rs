use crate::auth::models::{AuthUser, JwtClaims, UserRole};
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use phyllo_core::AppError;
use std::sync::Arc;

/// Shared state for the authentication layer
pub struct AuthState {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthState {
    pub fn new(jwt_secret: &str) -> Self {
        AuthState {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify an HS256 token and turn its claims into the caller identity.
    pub fn verify(&self, token: &str) -> Result<AuthUser, AppError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AppError::Unauthorized(
                "Token has no subject".to_string(),
            ));
        }

        Ok(AuthUser {
            id: claims.sub,
            role: UserRole::from_claim(claims.role.as_deref()),
        })
    }
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    match auth_state.verify(token) {
        Ok(user) => {
            tracing::debug!(user_id = %user.id, role = %user.role, "Authenticated request");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => HttpAppError(e).into_response(),
    }
}
