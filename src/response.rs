use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Either a single human-readable message or one message per invalid field.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Message {
    Text(String),
    Fields(Vec<String>),
}

impl Message {
    pub fn text(msg: impl Into<String>) -> Self {
        Message::Text(msg.into())
    }
}

/// Envelope shared by every JSON response, successful or not.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub status: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: true,
            status_code: StatusCode::OK.as_u16(),
            message: Message::text(message),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            status: true,
            status_code: StatusCode::OK.as_u16(),
            message: Message::text(message),
            data: None,
        }
    }

    pub fn error(status: StatusCode, message: Message) -> Self {
        Self {
            status: false,
            status_code: status.as_u16(),
            message,
            data: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, limit: u64, offset: u64) -> Self {
        let has_more = offset.saturating_add(items.len() as u64) < total;
        Self {
            items,
            total,
            limit,
            offset,
            has_more,
        }
    }
}

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaginationQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PaginationQuery {
    /// Clamp to `1..=MAX_LIMIT`, defaulting to `DEFAULT_LIMIT`.
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }
}
