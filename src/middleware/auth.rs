use crate::{
    error::AppError,
    models::User,
    utils::{cookie::extract_session_token, jwt::decode_session_token},
};
use axum::{
    extract::{FromRequestParts, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
    Extension,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

/// The signed-in user, resolved by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == crate::models::user::ROLE_ADMIN
    }

    /// Owners and admins may modify a resource.
    pub fn can_modify(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id || self.is_admin()
    }

    pub fn ensure_can_modify(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.can_modify(owner_id) {
            Ok(())
        } else {
            Err(AppError::not_owner())
        }
    }
}

/// Session middleware.
///
/// Accepts the token from `Authorization: Bearer` or the `token` cookie,
/// verifies it and loads the user so deleted accounts lose access immediately.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_session_token(&headers).ok_or(AppError::Unauthorized)?;
    let claims = decode_session_token(&token)?;
    let user_id = claims.user_id()?;

    let user = User::find_by_id(user_id)
        .one(&db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser {
        user_id: user.id,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Must run after `auth_middleware`.
pub async fn admin_middleware(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !auth_user.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role: role.to_string(),
        }
    }

    #[test]
    fn owner_can_modify_own_resource() {
        let u = user("user");
        assert!(u.can_modify(u.user_id));
        assert!(!u.can_modify(Uuid::new_v4()));
    }

    #[test]
    fn admin_can_modify_anything() {
        let admin = user("admin");
        assert!(admin.can_modify(Uuid::new_v4()));
    }

    #[test]
    fn non_owner_gets_forbidden() {
        let u = user("user");
        assert!(matches!(
            u.ensure_can_modify(Uuid::new_v4()),
            Err(AppError::Forbidden(_))
        ));
    }
}
