use crate::error::{AppError, AppResult};
use crate::extract::Json;
use crate::handlers::user::{PrivateUserResponse, UserResponse};
use crate::middleware::AuthUser;
use crate::models::UserModel;
use crate::response::ApiResponse;
use crate::services::auth::{AuthService, NewUser};
use crate::services::email::EmailService;
use crate::services::user::UserService;
use crate::utils::cookie::{build_clear_cookie, build_session_cookie, extract_session_token};
use crate::utils::encode_session_token;
use crate::utils::jwt::session_ttl;
use anyhow::anyhow;
use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub lastname: String,
    /// Public handle (2-50 characters)
    #[validate(length(min = 2, max = 50))]
    pub nickname: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub website: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub about: String,
    #[validate(email)]
    pub email: String,
    /// Phone number, also usable as a login
    #[validate(length(min = 5, max = 20))]
    pub tel: String,
    /// Password (6-64 characters)
    #[validate(length(min = 6, max = 64))]
    pub password: String,
}

impl From<SignupRequest> for NewUser {
    fn from(req: SignupRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            lastname: req.lastname.trim().to_string(),
            nickname: req.nickname.trim().to_string(),
            website: req.website.trim().to_string(),
            about: req.about.trim().to_string(),
            email: req.email.trim().to_string(),
            tel: req.tel.trim().to_string(),
            password: req.password,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EmailLoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TelLoginRequest {
    #[validate(length(min = 1))]
    pub tel: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Session token, also set as the `token` cookie
    pub token: String,
    pub user: PrivateUserResponse,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckCodeRequest {
    #[validate(email)]
    pub email: String,
    /// Six digit code from the reset email
    #[validate(length(equal = 6))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub code: String,
    #[validate(length(min = 6, max = 64))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub repassword: String,
}

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "User registered", body = UserResponse),
        (status = 400, description = "Validation error or identity already taken", body = AppError),
    ),
    tag = "auth"
)]
pub async fn signup(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate()?;

    let user = AuthService::new(db).signup(payload.into()).await?;
    Ok(ApiResponse::ok("User registered", UserResponse::from(user)))
}

#[utoipa::path(
    post,
    path = "/auth/login-with-email",
    request_body = EmailLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = AppError),
    ),
    tag = "auth"
)]
pub async fn login_with_email(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<EmailLoginRequest>,
) -> AppResult<Response> {
    payload.validate()?;

    let user = AuthService::new(db)
        .login_with_email(payload.email.trim(), &payload.password)
        .await?;
    start_session(user)
}

#[utoipa::path(
    post,
    path = "/auth/login-with-tel",
    request_body = TelLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = AppError),
    ),
    tag = "auth"
)]
pub async fn login_with_tel(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<TelLoginRequest>,
) -> AppResult<Response> {
    payload.validate()?;

    let user = AuthService::new(db)
        .login_with_tel(payload.tel.trim(), &payload.password)
        .await?;
    start_session(user)
}

#[utoipa::path(
    get,
    path = "/auth/autologin",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Current user", body = PrivateUserResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn autologin(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user = UserService::new(db).get_by_id(auth_user.user_id).await?;
    Ok(ApiResponse::ok("Session is valid", PrivateUserResponse::from(user)))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared"),
        (status = 400, description = "No active session", body = AppError),
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap) -> AppResult<Response> {
    if extract_session_token(&headers).is_none() {
        return Err(AppError::Validation("No active session".to_string()));
    }

    let mut response = ApiResponse::done("Logged out").into_response();
    append_set_cookie(&mut response, &build_clear_cookie())?;
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/auth/forgot_password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset code sent"),
        (status = 404, description = "No account with this email", body = AppError),
        (status = 500, description = "Email could not be sent", body = AppError),
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    Extension(db): Extension<DatabaseConnection>,
    Extension(email_service): Extension<EmailService>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate()?;

    AuthService::new(db)
        .forgot_password(payload.email.trim(), &email_service)
        .await?;
    Ok(ApiResponse::done("Reset code sent to your email"))
}

#[utoipa::path(
    post,
    path = "/auth/password_reset",
    request_body = CheckCodeRequest,
    responses(
        (status = 200, description = "Code is valid"),
        (status = 400, description = "Invalid or expired code", body = AppError),
    ),
    tag = "auth"
)]
pub async fn check_reset_code(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<CheckCodeRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate()?;

    AuthService::new(db)
        .check_reset_code(payload.email.trim(), payload.code.trim())
        .await?;
    Ok(ApiResponse::done("Code is valid"))
}

#[utoipa::path(
    post,
    path = "/auth/password_reset/verify",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Invalid code or mismatched passwords", body = AppError),
    ),
    tag = "auth"
)]
pub async fn reset_password(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate()?;

    AuthService::new(db)
        .reset_password(payload.email.trim(), payload.code.trim(), &payload.password)
        .await?;
    Ok(ApiResponse::done("Password has been reset"))
}

fn start_session(user: UserModel) -> AppResult<Response> {
    let ttl = session_ttl()?;
    let token = encode_session_token(user.id, &user.email)?;
    let cookie = build_session_cookie(&token, ttl);

    let body = LoginResponse {
        token,
        user: PrivateUserResponse::from(user),
    };
    let mut response = ApiResponse::ok("Logged in", body).into_response();
    append_set_cookie(&mut response, &cookie)?;
    Ok(response)
}

fn append_set_cookie(response: &mut Response, cookie: &str) -> AppResult<()> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| AppError::Internal(anyhow!("Invalid cookie header: {e}")))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}
