use crate::error::{AppError, AppResult};
use crate::extract::{Json, Multipart, Path};
use crate::middleware::AuthUser;
use crate::models::UserModel;
use crate::response::ApiResponse;
use crate::services::upload::{image_url, UploadConfig, UploadService};
use crate::services::user::{ProfileChanges, UserService};
use crate::utils::multipart::FormData;
use crate::utils::parse_uuid;
use axum::{response::IntoResponse, Extension};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Profile as anyone may see it.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub lastname: String,
    pub nickname: String,
    pub website: String,
    pub about: String,
    pub role: String,
    /// Avatar URL
    pub avatar: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            name: user.name,
            lastname: user.lastname,
            nickname: user.nickname,
            website: user.website,
            about: user.about,
            role: user.role,
            avatar: user.avatar.as_deref().map(image_url),
            created_at: user.created_at,
        }
    }
}

/// Profile as its owner sees it, contact details included.
#[derive(Debug, Serialize, ToSchema)]
pub struct PrivateUserResponse {
    #[serde(flatten)]
    pub profile: UserResponse,
    pub email: String,
    pub tel: String,
    pub updated_at: NaiveDateTime,
}

impl From<UserModel> for PrivateUserResponse {
    fn from(user: UserModel) -> Self {
        let email = user.email.clone();
        let tel = user.tel.clone();
        let updated_at = user.updated_at;
        Self {
            profile: UserResponse::from(user),
            email,
            tel,
            updated_at,
        }
    }
}

/// Author line embedded in questions and comments.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub nickname: String,
    pub avatar: Option<String>,
}

impl From<&UserModel> for UserSummary {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname.clone(),
            avatar: user.avatar.as_deref().map(image_url),
        }
    }
}

/// Multipart body of `load_avatar`.
#[derive(ToSchema)]
pub struct AvatarUpload {
    /// A jpeg or png up to 3 MB
    #[schema(format = Binary)]
    pub avatar: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub lastname: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub nickname: Option<String>,
    #[validate(length(max = 255))]
    pub website: Option<String>,
    #[validate(length(max = 2000))]
    pub about: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 5, max = 20))]
    pub tel: Option<String>,
    #[validate(length(min = 6, max = 64))]
    pub password: Option<String>,
    pub repassword: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl UpdateUserRequest {
    /// Blank fields count as absent.
    fn normalized(self) -> Self {
        Self {
            name: present(self.name),
            lastname: present(self.lastname),
            nickname: present(self.nickname),
            website: present(self.website),
            about: present(self.about),
            email: present(self.email),
            tel: present(self.tel),
            password: self.password.filter(|p| !p.is_empty()),
            repassword: self.repassword.filter(|p| !p.is_empty()),
        }
    }

    fn into_changes(self) -> AppResult<ProfileChanges> {
        if let Some(password) = &self.password {
            if self.repassword.as_ref() != Some(password) {
                return Err(AppError::InvalidFields(vec![
                    "'repassword' does not match".to_string(),
                ]));
            }
        }

        Ok(ProfileChanges {
            name: self.name,
            lastname: self.lastname,
            nickname: self.nickname,
            website: self.website,
            about: self.about,
            email: self.email,
            tel: self.tel,
            password: self.password,
        })
    }
}

#[utoipa::path(
    get,
    path = "/user/",
    responses(
        (status = 200, description = "All users, newest first", body = Vec<UserResponse>),
    ),
    tag = "user"
)]
pub async fn list_users(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let users = UserService::new(db).list().await?;
    let items: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(ApiResponse::ok("Users fetched", items))
}

#[utoipa::path(
    get,
    path = "/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 400, description = "Malformed id", body = AppError),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "user"
)]
pub async fn get_user(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_uuid(&id, "id")?;
    let user = UserService::new(db).get_by_id(id).await?;
    Ok(ApiResponse::ok("User fetched", UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/user/update",
    security(("jwt_token" = [])),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = PrivateUserResponse),
        (status = 400, description = "Validation error or identity clash", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "user"
)]
pub async fn update_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let payload = payload.normalized();
    payload.validate()?;
    let changes = payload.into_changes()?;

    let user = UserService::new(db)
        .update_profile(auth_user.user_id, changes)
        .await?;
    Ok(ApiResponse::ok("Profile updated", PrivateUserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/user/load-avatar",
    security(("jwt_token" = [])),
    request_body(content = AvatarUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Avatar replaced", body = PrivateUserResponse),
        (status = 400, description = "Missing or invalid image", body = AppError),
        (status = 413, description = "Image too large", body = AppError),
    ),
    tag = "user"
)]
pub async fn load_avatar(
    Extension(db): Extension<DatabaseConnection>,
    Extension(uploads): Extension<UploadConfig>,
    auth_user: AuthUser,
    Multipart(multipart): Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = FormData::read(multipart).await?;
    let file = form
        .take_files("avatar")
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Validation("Please provide an 'avatar' image".to_string()))?;

    let image = UploadService::prepare(file)?;
    UploadService::store_all(&uploads, std::slice::from_ref(&image)).await?;

    let service = UserService::new(db);
    let (user, previous) = match service.set_avatar(auth_user.user_id, &image.file_name).await {
        Ok(result) => result,
        Err(e) => {
            UploadService::remove_all(&uploads, std::slice::from_ref(&image.file_name)).await;
            return Err(e);
        }
    };
    if let Some(previous) = previous {
        UploadService::remove_all(&uploads, &[previous]).await;
    }

    Ok(ApiResponse::ok("Avatar updated", PrivateUserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/user/delete-avatar",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Avatar removed"),
        (status = 400, description = "No avatar to delete", body = AppError),
    ),
    tag = "user"
)]
pub async fn delete_avatar(
    Extension(db): Extension<DatabaseConnection>,
    Extension(uploads): Extension<UploadConfig>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let previous = UserService::new(db).clear_avatar(auth_user.user_id).await?;
    UploadService::remove_all(&uploads, &[previous]).await;
    Ok(ApiResponse::done("Avatar deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_ignored() {
        let req = UpdateUserRequest {
            name: Some("  ".to_string()),
            email: Some(String::new()),
            about: Some(" hello ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert!(req.name.is_none());
        assert!(req.email.is_none());
        assert_eq!(req.about.as_deref(), Some("hello"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn password_needs_matching_repassword() {
        let req = UpdateUserRequest {
            password: Some("secret1".to_string()),
            repassword: Some("secret2".to_string()),
            ..Default::default()
        };
        assert!(matches!(req.into_changes(), Err(AppError::InvalidFields(_))));

        let req = UpdateUserRequest {
            password: Some("secret1".to_string()),
            repassword: Some("secret1".to_string()),
            ..Default::default()
        };
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.password.as_deref(), Some("secret1"));
    }
}
