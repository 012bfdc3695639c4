use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jsonwebtoken::errors::ErrorKind as TokenErrorKind;
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::error::ErrorKind as DbErrorKind;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::permissions::PermissionError;

/// ApiError
///
/// The single error type every service, repository and extractor returns.
/// Rendered by `IntoResponse` into the `{success:false, error:{code,message,details?}}` envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldError>,
    },
    #[error("{message}")]
    TooManyRequests {
        code: &'static str,
        message: &'static str,
    },
    #[error("{0}")]
    Internal(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// One failed field rule, reported under `error.details`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// ErrorEnvelope
///
/// Wire shape of every failed response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

/// Underlying cause of a 500, attached to the response extensions so a local-only
/// layer can surface it. Never serialized in production.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// 429 with a limiter-specific code, e.g. `LOGIN_RATE_LIMIT_EXCEEDED`.
    pub fn too_many_requests(code: &'static str, message: &'static str) -> Self {
        Self::TooManyRequests { code, message }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        Self::Validation {
            message: "Validation failed".to_string(),
            details,
        }
    }

    /// HTTP status this error is rendered with.
    pub fn status(&self) -> StatusCode {
        self.parts().0
    }

    /// Machine-readable code placed in `error.code`.
    pub fn code(&self) -> &'static str {
        self.parts().1
    }

    fn parts(&self) -> (StatusCode, &'static str, String, Option<Value>) {
        match self {
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.clone(), None)
            }
            Self::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message.clone(), None)
            }
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, "FORBIDDEN", message.clone(), None),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, "NOT_FOUND", message.clone(), None),
            Self::Conflict(message) => (StatusCode::CONFLICT, "CONFLICT", message.clone(), None),
            Self::Validation { message, details } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                message.clone(),
                Some(json!(details)),
            ),
            Self::TooManyRequests { code, message } => (
                StatusCode::TOO_MANY_REQUESTS,
                *code,
                message.to_string(),
                None,
            ),
            Self::Internal(_) => internal_parts(),
            Self::Token(err) => match err.kind() {
                TokenErrorKind::ExpiredSignature => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_EXPIRED",
                    "Authentication token has expired".to_string(),
                    None,
                ),
                _ => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    "Invalid authentication token".to_string(),
                    None,
                ),
            },
            Self::Database(err) => database_parts(err),
        }
    }
}

fn internal_parts() -> (StatusCode, &'static str, String, Option<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An unexpected error occurred".to_string(),
        None,
    )
}

/// Translates driver-level failures into the same taxonomy the services raise.
fn database_parts(err: &sqlx::Error) -> (StatusCode, &'static str, String, Option<Value>) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
            None,
        ),
        sqlx::Error::Database(db_err) => match db_err.kind() {
            DbErrorKind::UniqueViolation => (
                StatusCode::CONFLICT,
                "CONFLICT",
                "Resource already exists".to_string(),
                db_err.constraint().map(|c| json!({ "constraint": c })),
            ),
            DbErrorKind::ForeignKeyViolation => (
                StatusCode::BAD_REQUEST,
                "INVALID_REFERENCE",
                "Referenced resource does not exist".to_string(),
                None,
            ),
            DbErrorKind::CheckViolation | DbErrorKind::NotNullViolation => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                "Value violates a database constraint".to_string(),
                None,
            ),
            _ => internal_parts(),
        },
        _ => internal_parts(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(%status, code, %message, "request rejected");
        }

        let envelope = ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        let mut response = (status, Json(envelope)).into_response();
        if status.is_server_error() {
            response
                .extensions_mut()
                .insert(InternalDetail(self.to_string()));
        }
        response
    }
}

// --- Conversions from extractor and library failures ---

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, field_errors)| {
                let field = field.to_string();
                field_errors.iter().map(move |error| {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"));
                    FieldError::new(field.clone(), message)
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        Self::validation(details)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON with the wrong shape (missing field, bad enum value).
            JsonRejection::JsonDataError(err) => {
                Self::validation(vec![FieldError::new("body", err.body_text())])
            }
            other => Self::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::BadRequest("File too large".to_string())
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        Self::Internal(format!("role permissions are malformed: {err}"))
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::Internal(format!("password hashing failed: {err}"))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("i/o failure: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_and_code() {
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").code(), "CONFLICT");
        assert_eq!(
            ApiError::validation(vec![]).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::internal("boom").code(), "INTERNAL_ERROR");
    }

    #[test]
    fn internal_message_is_generic() {
        let (_, _, message, _) = ApiError::internal("disk on fire").parts();
        assert_eq!(message, "An unexpected error occurred");
    }
}
