use crate::error::AppResult;
use crate::models::TagModel;
use crate::response::ApiResponse;
use crate::services::tag::TagService;
use axum::{response::IntoResponse, Extension};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct TagResponse {
    pub id: Uuid,
    /// Lowercase tag name
    pub name: String,
    pub created_at: NaiveDateTime,
}

impl From<TagModel> for TagResponse {
    fn from(t: TagModel) -> Self {
        Self {
            id: t.id,
            name: t.name,
            created_at: t.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/tags/",
    responses(
        (status = 200, description = "All tags by name", body = Vec<TagResponse>),
    ),
    tag = "tags"
)]
pub async fn list_tags(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let tags = TagService::new(db).list().await?;
    let items: Vec<TagResponse> = tags.into_iter().map(TagResponse::from).collect();
    Ok(ApiResponse::ok("Tags fetched", items))
}
