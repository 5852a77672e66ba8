use crate::error::HttpAppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use phyllo_core::AppError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// User role for authorization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    /// Roles arrive as free text in the token; anything that is not `admin` is a plain user.
    pub fn from_claim(role: Option<&str>) -> Self {
        match role {
            Some(role) if role.eq_ignore_ascii_case("admin") => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::User => write!(f, "user"),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String, // user_id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated caller, inserted into request extensions by [`auth_middleware`].
///
/// [`auth_middleware`]: crate::auth::auth_middleware
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Fail with 403 unless the caller is an admin.
    pub fn require_admin(&self) -> Result<(), HttpAppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(HttpAppError(AppError::Forbidden(
                "Admin role required".to_string(),
            )))
        }
    }
}

// Extension<AuthUser> does not compose with Multipart, so read the extension directly.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized(
                    "Missing authentication context".to_string(),
                ))
            })
    }
}
