use crate::error::{AppError, AppResult};
use crate::extract::{Json, Multipart, Path, Query};
use crate::handlers::tag::TagResponse;
use crate::handlers::user::UserSummary;
use crate::middleware::AuthUser;
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::question::{
    NewQuestion, QuestionChanges, QuestionDetails, QuestionFilter, QuestionService,
};
use crate::services::upload::{image_url, stored_name, UploadConfig, UploadService};
use crate::utils::multipart::FormData;
use crate::utils::params::parse_name_list;
use crate::utils::{parse_uuid, parse_uuid_list, render_markdown};
use axum::{response::IntoResponse, Extension};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub header: String,
    /// Markdown as submitted
    pub content: String,
    /// Sanitized HTML rendering of `content`
    pub content_html: String,
    /// Image URLs
    pub images: Vec<String>,
    pub views_count: i64,
    pub tags: Vec<TagResponse>,
    pub author: Option<UserSummary>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<QuestionDetails> for QuestionResponse {
    fn from(details: QuestionDetails) -> Self {
        let q = details.question;
        Self {
            id: q.id,
            header: q.header,
            content_html: render_markdown(&q.content),
            content: q.content,
            images: q.images.iter().map(|name| image_url(name)).collect(),
            views_count: q.views_count,
            tags: details.tags.into_iter().map(TagResponse::from).collect(),
            author: details.author.as_ref().map(UserSummary::from),
            created_at: q.created_at,
            updated_at: q.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuestionListQuery {
    /// Comma separated tag names; matches questions with any of them
    pub tags: Option<String>,
    /// `asc` or `desc` by creation time (default `desc`)
    pub sort: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QuestionListQuery {
    fn into_filter(self) -> AppResult<QuestionFilter> {
        let ascending = match self.sort.as_deref().map(str::trim) {
            None | Some("") | Some("desc") => false,
            Some("asc") => true,
            Some(_) => {
                return Err(AppError::Validation(
                    "'sort' must be either 'asc' or 'desc'".to_string(),
                ))
            }
        };
        let page = PaginationQuery {
            limit: self.limit,
            offset: self.offset,
        };

        Ok(QuestionFilter {
            tags: self.tags.as_deref().map(parse_name_list).unwrap_or_default(),
            ascending,
            limit: page.limit(),
            offset: page.offset(),
        })
    }
}

/// Multipart body of `create_question`.
#[derive(ToSchema)]
pub struct QuestionUpload {
    pub header: String,
    pub content: String,
    /// Comma separated tag ids
    pub tags: Option<String>,
    /// jpeg or png files, at most 10
    #[schema(format = Binary)]
    pub images: Vec<String>,
}

/// Text fields of the create form.
#[derive(Debug, Validate)]
struct QuestionForm {
    #[validate(length(min = 3, max = 255))]
    header: String,
    #[validate(length(min = 1))]
    content: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 3, max = 255))]
    pub header: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
    /// Tag ids; replaces the whole tag set when present
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeleteImagesRequest {
    pub question_id: String,
    /// Stored names or URLs of the images to drop
    #[validate(length(min = 1, max = 10))]
    pub image_list: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/question/questions",
    params(QuestionListQuery),
    responses(
        (status = 200, description = "A page of questions", body = PaginatedResponse<QuestionResponse>),
        (status = 400, description = "Invalid query", body = AppError),
    ),
    tag = "question"
)]
pub async fn list_questions(
    Extension(db): Extension<DatabaseConnection>,
    Query(params): Query<QuestionListQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let (questions, total) = QuestionService::new(db).list(&filter).await?;
    let items: Vec<QuestionResponse> = questions.into_iter().map(QuestionResponse::from).collect();

    Ok(ApiResponse::ok(
        "Questions fetched",
        PaginatedResponse::new(items, total, filter.limit, filter.offset),
    ))
}

#[utoipa::path(
    get,
    path = "/question/{id}",
    params(("id" = Uuid, Path, description = "Question ID")),
    responses(
        (status = 200, description = "The question; its view counter is bumped", body = QuestionResponse),
        (status = 404, description = "Question not found", body = AppError),
    ),
    tag = "question"
)]
pub async fn get_question(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_uuid(&id, "id")?;
    let question = QuestionService::new(db).view(id).await?;
    Ok(ApiResponse::ok("Question fetched", QuestionResponse::from(question)))
}

#[utoipa::path(
    get,
    path = "/question/by/{id}",
    params(("id" = Uuid, Path, description = "Author's user ID")),
    responses(
        (status = 200, description = "The user's questions, newest first", body = Vec<QuestionResponse>),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "question"
)]
pub async fn list_user_questions(
    Extension(db): Extension<DatabaseConnection>,
    Path(user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_uuid(&user_id, "user_id")?;
    let questions = QuestionService::new(db).list_by_user(user_id).await?;
    let items: Vec<QuestionResponse> = questions.into_iter().map(QuestionResponse::from).collect();
    Ok(ApiResponse::ok("Questions fetched", items))
}

#[utoipa::path(
    post,
    path = "/question/create",
    security(("jwt_token" = [])),
    request_body(content = QuestionUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Question created", body = QuestionResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 413, description = "Image too large", body = AppError),
    ),
    tag = "question"
)]
pub async fn create_question(
    Extension(db): Extension<DatabaseConnection>,
    Extension(uploads): Extension<UploadConfig>,
    auth_user: AuthUser,
    Multipart(multipart): Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = FormData::read(multipart).await?;

    let fields = QuestionForm {
        header: form.text("header").unwrap_or_default().to_string(),
        content: form.text("content").unwrap_or_default().to_string(),
    };
    fields.validate()?;

    let tag_ids = parse_uuid_list(form.text("tags").unwrap_or_default(), "tags")?;
    let images = UploadService::prepare_all(form.take_files("images"))?;

    let question = QuestionService::new(db)
        .create(
            auth_user.user_id,
            NewQuestion {
                header: fields.header,
                content: fields.content,
                tag_ids,
                images,
            },
            &uploads,
        )
        .await?;
    Ok(ApiResponse::ok("Question created", QuestionResponse::from(question)))
}

#[utoipa::path(
    put,
    path = "/question/{id}/update",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Question ID")),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Question updated", body = QuestionResponse),
        (status = 403, description = "Not the author", body = AppError),
        (status = 404, description = "Question not found", body = AppError),
    ),
    tag = "question"
)]
pub async fn update_question(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> AppResult<impl IntoResponse> {
    let id = parse_uuid(&id, "id")?;
    let payload = UpdateQuestionRequest {
        header: payload.header.map(|h| h.trim().to_string()),
        content: payload.content.map(|c| c.trim().to_string()),
        tags: payload.tags,
    };
    payload.validate()?;

    let tag_ids = match payload.tags {
        Some(raw) => Some(parse_uuid_list(&raw.join(","), "tags")?),
        None => None,
    };
    let changes = QuestionChanges {
        header: payload.header,
        content: payload.content,
        tag_ids,
    };

    let question = QuestionService::new(db)
        .update(id, &auth_user, changes)
        .await?;
    Ok(ApiResponse::ok("Question updated", QuestionResponse::from(question)))
}

#[utoipa::path(
    delete,
    path = "/question/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Question deleted"),
        (status = 403, description = "Not the author", body = AppError),
        (status = 404, description = "Question not found", body = AppError),
    ),
    tag = "question"
)]
pub async fn delete_question(
    Extension(db): Extension<DatabaseConnection>,
    Extension(uploads): Extension<UploadConfig>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_uuid(&id, "id")?;
    QuestionService::new(db)
        .delete(id, &auth_user, &uploads)
        .await?;
    Ok(ApiResponse::done("Question deleted"))
}

#[utoipa::path(
    delete,
    path = "/question/delete-images",
    security(("jwt_token" = [])),
    request_body = DeleteImagesRequest,
    responses(
        (status = 200, description = "Images removed", body = QuestionResponse),
        (status = 403, description = "Not the author", body = AppError),
        (status = 404, description = "Question not found", body = AppError),
    ),
    tag = "question"
)]
pub async fn delete_question_images(
    Extension(db): Extension<DatabaseConnection>,
    Extension(uploads): Extension<UploadConfig>,
    auth_user: AuthUser,
    Json(payload): Json<DeleteImagesRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate()?;
    let id = parse_uuid(&payload.question_id, "question_id")?;
    let names: Vec<String> = payload
        .image_list
        .iter()
        .map(|reference| stored_name(reference).to_string())
        .collect();

    let question = QuestionService::new(db)
        .delete_images(id, &auth_user, &names, &uploads)
        .await?;
    Ok(ApiResponse::ok("Images deleted", QuestionResponse::from(question)))
}
