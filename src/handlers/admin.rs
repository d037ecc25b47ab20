use crate::error::AppResult;
use crate::extract::{Json, Path};
use crate::handlers::tag::TagResponse;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::services::admin::{AdminService, MonthlyActivity, Statistics};
use crate::services::tag::TagService;
use crate::services::upload::UploadConfig;
use crate::utils::parse_uuid;
use axum::{response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsResponse {
    pub user_count: u64,
    pub question_count: u64,
    pub comment_count: u64,
}

impl From<Statistics> for StatisticsResponse {
    fn from(s: Statistics) -> Self {
        Self {
            user_count: s.users,
            question_count: s.questions,
            comment_count: s.comments,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlyActivityResponse {
    /// Calendar month as `YYYY-MM`
    pub month: String,
    pub question_count: u64,
    pub comment_count: u64,
}

impl From<MonthlyActivity> for MonthlyActivityResponse {
    fn from(m: MonthlyActivity) -> Self {
        Self {
            month: m.month,
            question_count: m.questions,
            comment_count: m.comments,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddTagRequest {
    /// Tag name (1-50 characters), stored lowercase
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/admin/get-statics",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Site totals", body = StatisticsResponse),
        (status = 403, description = "Admin only", body = crate::error::AppError),
    ),
    tag = "admin"
)]
pub async fn get_statistics(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let stats = AdminService::new(db).statistics().await?;
    Ok(ApiResponse::ok("Statistics fetched", StatisticsResponse::from(stats)))
}

#[utoipa::path(
    get,
    path = "/admin/six-months-data",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Monthly activity, newest month first", body = Vec<MonthlyActivityResponse>),
        (status = 403, description = "Admin only", body = crate::error::AppError),
    ),
    tag = "admin"
)]
pub async fn six_months_data(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let today = chrono::Utc::now().date_naive();
    let activity = AdminService::new(db).monthly_activity(today).await?;
    let items: Vec<MonthlyActivityResponse> = activity
        .into_iter()
        .map(MonthlyActivityResponse::from)
        .collect();
    Ok(ApiResponse::ok("Six months data fetched", items))
}

#[utoipa::path(
    delete,
    path = "/admin/{id}/delete-user",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User and their content deleted"),
        (status = 400, description = "Cannot delete yourself", body = crate::error::AppError),
        (status = 404, description = "User not found", body = crate::error::AppError),
    ),
    tag = "admin"
)]
pub async fn delete_user(
    Extension(db): Extension<DatabaseConnection>,
    Extension(uploads): Extension<UploadConfig>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_uuid(&id, "id")?;
    AdminService::new(db)
        .delete_user(auth_user.user_id, id, &uploads)
        .await?;
    Ok(ApiResponse::done("User deleted"))
}

#[utoipa::path(
    post,
    path = "/admin/add-tag",
    security(("jwt_token" = [])),
    request_body = AddTagRequest,
    responses(
        (status = 200, description = "Tag created", body = TagResponse),
        (status = 400, description = "Invalid or duplicate tag", body = crate::error::AppError),
        (status = 403, description = "Admin only", body = crate::error::AppError),
    ),
    tag = "admin"
)]
pub async fn add_tag(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<AddTagRequest>,
) -> AppResult<impl IntoResponse> {
    let payload = AddTagRequest {
        name: payload.name.trim().to_string(),
    };
    payload.validate()?;

    let tag = TagService::new(db).create(&payload.name).await?;
    Ok(ApiResponse::ok("Tag created", TagResponse::from(tag)))
}

#[utoipa::path(
    delete,
    path = "/admin/{id}/delete-tag",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Tag deleted"),
        (status = 404, description = "Tag not found", body = crate::error::AppError),
    ),
    tag = "admin"
)]
pub async fn delete_tag(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_uuid(&id, "id")?;
    TagService::new(db).delete(id).await?;
    Ok(ApiResponse::done("Tag deleted"))
}
