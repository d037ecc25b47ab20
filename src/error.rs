use crate::response::{ApiResponse, Message};
use axum::{
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid fields: {0:?}")]
    InvalidFields(Vec<String>),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    pub fn not_owner() -> Self {
        AppError::Forbidden("You are not allowed to modify this resource".to_string())
    }

    /// Turn a unique-constraint violation into a field-level validation error.
    /// Any other database error passes through unchanged.
    pub fn from_unique_violation(err: sea_orm::DbErr, message: &str) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                AppError::InvalidFields(vec![message.to_string()])
            }
            _ => AppError::Database(err),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized | AppError::InvalidCredentials | AppError::Jwt(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::InvalidFields(field_messages(&errors))
    }
}

/// Map an axum extractor rejection onto the error classes the envelope knows.
fn from_rejection(status: StatusCode, text: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(text)
    } else if status.is_server_error() {
        AppError::Internal(anyhow::anyhow!(text))
    } else {
        AppError::Validation(text)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

/// Flatten validator output into one readable message per failed rule,
/// sorted so responses are stable.
pub fn field_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| errs.iter().map(move |e| describe(&field, e)))
        .collect();
    messages.sort();
    messages
}

fn describe(field: &str, err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return format!("'{field}' {message}");
    }

    match err.code.as_ref() {
        "email" => format!("'{field}' must be a valid email address"),
        "url" => format!("'{field}' must be a valid URL"),
        "length" => match (err.params.get("min"), err.params.get("max")) {
            (Some(min), Some(max)) => {
                format!("'{field}' must be between {min} and {max} characters")
            }
            (Some(min), None) => format!("'{field}' must be at least {min} characters"),
            (None, Some(max)) => format!("'{field}' must be at most {max} characters"),
            (None, None) => format!("'{field}' has an invalid length"),
        },
        "must_match" => format!("'{field}' does not match"),
        _ => format!("'{field}' is invalid"),
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub status: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: Message,
}

impl utoipa::ToSchema for AppError {
    fn name() -> std::borrow::Cow<'static, str> {
        "ErrorResponse".into()
    }
}

impl utoipa::PartialSchema for AppError {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        ErrorResponse::schema()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                Message::text("Internal server error")
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                Message::text("Internal server error")
            }
            AppError::Jwt(e) => {
                tracing::debug!("JWT rejected: {:?}", e);
                Message::text("Invalid or expired session")
            }
            AppError::Unauthorized => Message::text("Unauthorized"),
            AppError::InvalidCredentials => Message::text("Invalid credentials"),
            AppError::NotFound(msg)
            | AppError::Forbidden(msg)
            | AppError::Validation(msg)
            | AppError::PayloadTooLarge(msg) => Message::Text(msg),
            AppError::InvalidFields(messages) => Message::Fields(messages),
        };

        ApiResponse::<()>::error(status, message).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(email)]
        email: String,
        #[validate(length(min = 6, max = 64))]
        password: String,
        #[validate(length(min = 1, message = "cannot be empty"))]
        nickname: String,
    }

    #[test]
    fn validation_errors_become_field_messages() {
        let form = Signup {
            email: "not-an-email".to_string(),
            password: "123".to_string(),
            nickname: String::new(),
        };
        let err: AppError = form.validate().unwrap_err().into();
        match err {
            AppError::InvalidFields(messages) => {
                assert_eq!(
                    messages,
                    vec![
                        "'email' must be a valid email address".to_string(),
                        "'nickname' cannot be empty".to_string(),
                        "'password' must be between 6 and 64 characters".to_string(),
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidFields(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::not_owner().status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::not_found("Question").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_names_the_resource() {
        match AppError::not_found("Comment") {
            AppError::NotFound(msg) => assert_eq!(msg, "Comment not found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
