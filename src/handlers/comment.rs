use crate::error::AppResult;
use crate::extract::{Json, Multipart, Path};
use crate::handlers::user::UserSummary;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::services::comment::{CommentDetails, CommentService};
use crate::services::reaction::{ReactionCounts, ReactionKind, ReactionService, ReactionState};
use crate::services::upload::{image_url, UploadConfig, UploadService};
use crate::utils::multipart::FormData;
use crate::utils::{parse_uuid, render_markdown};
use axum::{response::IntoResponse, Extension};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: Uuid,
    pub question_id: Uuid,
    pub content: String,
    pub content_html: String,
    pub images: Vec<String>,
    pub author: Option<UserSummary>,
    pub like_count: i64,
    pub dislike_count: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<CommentDetails> for CommentResponse {
    fn from(details: CommentDetails) -> Self {
        let c = details.comment;
        Self {
            id: c.id,
            question_id: c.question_id,
            content_html: render_markdown(&c.content),
            content: c.content,
            images: c.images.iter().map(|name| image_url(name)).collect(),
            author: details.author.as_ref().map(UserSummary::from),
            like_count: details.reactions.like_count,
            dislike_count: details.reactions.dislike_count,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReactionResponse {
    /// The caller's reaction after the toggle
    pub reaction: ReactionState,
    pub like_count: i64,
    pub dislike_count: i64,
}

/// Multipart body of `add_comment`.
#[derive(ToSchema)]
pub struct CommentUpload {
    pub comment: String,
    /// jpeg or png files, at most 10
    #[schema(format = Binary)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 5000))]
    pub comment: String,
}

#[utoipa::path(
    post,
    path = "/comment/{id}/add-comment",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Question ID")),
    request_body(content = CommentUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Validation error", body = crate::error::AppError),
        (status = 404, description = "Question not found", body = crate::error::AppError),
    ),
    tag = "comment"
)]
pub async fn add_comment(
    Extension(db): Extension<DatabaseConnection>,
    Extension(uploads): Extension<UploadConfig>,
    auth_user: AuthUser,
    Path(question_id): Path<String>,
    Multipart(multipart): Multipart,
) -> AppResult<impl IntoResponse> {
    let question_id = parse_uuid(&question_id, "question_id")?;
    let mut form = FormData::read(multipart).await?;

    let fields = CommentRequest {
        comment: form.text("comment").unwrap_or_default().to_string(),
    };
    fields.validate()?;
    let images = UploadService::prepare_all(form.take_files("images"))?;

    let comment = CommentService::new(db)
        .create(question_id, auth_user.user_id, fields.comment, images, &uploads)
        .await?;
    Ok(ApiResponse::ok("Comment added", CommentResponse::from(comment)))
}

#[utoipa::path(
    put,
    path = "/comment/{id}/update-comment",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Comment ID")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 403, description = "Not the author", body = crate::error::AppError),
        (status = 404, description = "Comment not found", body = crate::error::AppError),
    ),
    tag = "comment"
)]
pub async fn update_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<CommentRequest>,
) -> AppResult<impl IntoResponse> {
    let id = parse_uuid(&id, "id")?;
    let payload = CommentRequest {
        comment: payload.comment.trim().to_string(),
    };
    payload.validate()?;

    let comment = CommentService::new(db)
        .update(id, &auth_user, payload.comment)
        .await?;
    Ok(ApiResponse::ok("Comment updated", CommentResponse::from(comment)))
}

#[utoipa::path(
    delete,
    path = "/comment/{id}/delete-comment",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment deleted"),
        (status = 403, description = "Not the author", body = crate::error::AppError),
        (status = 404, description = "Comment not found", body = crate::error::AppError),
    ),
    tag = "comment"
)]
pub async fn delete_comment(
    Extension(db): Extension<DatabaseConnection>,
    Extension(uploads): Extension<UploadConfig>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_uuid(&id, "id")?;
    CommentService::new(db)
        .delete(id, &auth_user, &uploads)
        .await?;
    Ok(ApiResponse::done("Comment deleted"))
}

#[utoipa::path(
    get,
    path = "/comment/{id}/comments",
    params(("id" = Uuid, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Comments, newest first", body = Vec<CommentResponse>),
        (status = 404, description = "Question not found", body = crate::error::AppError),
    ),
    tag = "comment"
)]
pub async fn list_comments(
    Extension(db): Extension<DatabaseConnection>,
    Path(question_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let question_id = parse_uuid(&question_id, "question_id")?;
    let comments = CommentService::new(db)
        .list_for_question(question_id)
        .await?;
    let items: Vec<CommentResponse> = comments.into_iter().map(CommentResponse::from).collect();
    Ok(ApiResponse::ok("Comments fetched", items))
}

#[utoipa::path(
    post,
    path = "/comment/{id}/like",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Like toggled", body = ReactionResponse),
        (status = 404, description = "Comment not found", body = crate::error::AppError),
    ),
    tag = "comment"
)]
pub async fn like_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    react(db, auth_user, &id, ReactionKind::Like).await
}

#[utoipa::path(
    post,
    path = "/comment/{id}/dislike",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Dislike toggled", body = ReactionResponse),
        (status = 404, description = "Comment not found", body = crate::error::AppError),
    ),
    tag = "comment"
)]
pub async fn dislike_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    react(db, auth_user, &id, ReactionKind::Dislike).await
}

#[utoipa::path(
    get,
    path = "/comment/{id}/reaction-count",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Like and dislike totals", body = ReactionCounts),
        (status = 404, description = "Comment not found", body = crate::error::AppError),
    ),
    tag = "comment"
)]
pub async fn reaction_count(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_uuid(&id, "id")?;
    let counts = ReactionService::new(db).counts(id).await?;
    Ok(ApiResponse::ok("Reaction count fetched", counts))
}

async fn react(
    db: DatabaseConnection,
    auth_user: AuthUser,
    raw_id: &str,
    kind: ReactionKind,
) -> AppResult<ApiResponse<ReactionResponse>> {
    let id = parse_uuid(raw_id, "id")?;
    let (reaction, counts) = ReactionService::new(db)
        .toggle(id, auth_user.user_id, kind)
        .await?;

    Ok(ApiResponse::ok(
        "Reaction updated",
        ReactionResponse {
            reaction,
            like_count: counts.like_count,
            dislike_count: counts.dislike_count,
        },
    ))
}
