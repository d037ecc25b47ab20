use crate::{
    error::{AppError, AppResult},
    models::{reset_code, user, ResetCode, User, UserModel},
    services::{email::EmailService, user::find_identity_clashes},
    utils::{
        hash_password,
        reset_code::{
            codes_match, generate_reset_code, reset_code_expiry, RESET_CODE_TTL_MINUTES,
        },
        verify_password,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use uuid::Uuid;

#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub lastname: String,
    pub nickname: String,
    pub website: String,
    pub about: String,
    pub email: String,
    pub tel: String,
    pub password: String,
}

pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn signup(&self, input: NewUser) -> AppResult<UserModel> {
        let clashes = find_identity_clashes(
            &self.db,
            Some(&input.nickname),
            Some(&input.email),
            Some(&input.tel),
            None,
        )
        .await?;
        if !clashes.is_empty() {
            return Err(AppError::InvalidFields(clashes));
        }

        let password_hash = hash_password(&input.password)?;
        let now = chrono::Utc::now().naive_utc();

        let new_user = user::ActiveModel {
            id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
            name: sea_orm::ActiveValue::Set(input.name),
            lastname: sea_orm::ActiveValue::Set(input.lastname),
            nickname: sea_orm::ActiveValue::Set(input.nickname),
            website: sea_orm::ActiveValue::Set(input.website),
            about: sea_orm::ActiveValue::Set(input.about),
            email: sea_orm::ActiveValue::Set(input.email),
            tel: sea_orm::ActiveValue::Set(input.tel),
            password_hash: sea_orm::ActiveValue::Set(password_hash),
            role: sea_orm::ActiveValue::Set(user::ROLE_USER.to_string()),
            avatar: sea_orm::ActiveValue::Set(None),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
        };

        let user = new_user.insert(&self.db).await.map_err(|e| {
            AppError::from_unique_violation(e, "'nickname', 'email' or 'tel' is already in use")
        })?;
        tracing::info!(user_id = %user.id, nickname = %user.nickname, "User registered");
        Ok(user)
    }

    pub async fn login_with_email(&self, email: &str, password: &str) -> AppResult<UserModel> {
        let user = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        check_credentials(user, password)
    }

    pub async fn login_with_tel(&self, tel: &str, password: &str) -> AppResult<UserModel> {
        let user = User::find()
            .filter(user::Column::Tel.eq(tel))
            .one(&self.db)
            .await?;
        check_credentials(user, password)
    }

    /// Issue a reset code and mail it. The code is dropped again if mailing fails.
    pub async fn forgot_password(&self, email: &str, mailer: &EmailService) -> AppResult<()> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let code = generate_reset_code()?;
        let now = chrono::Utc::now().naive_utc();

        let saved = reset_code::ActiveModel {
            id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
            email: sea_orm::ActiveValue::Set(email.to_string()),
            code: sea_orm::ActiveValue::Set(code.clone()),
            expires_at: sea_orm::ActiveValue::Set(reset_code_expiry(now)),
            created_at: sea_orm::ActiveValue::Set(now),
        }
        .insert(&self.db)
        .await?;

        if let Err(e) = mailer
            .send_reset_code(email, &code, RESET_CODE_TTL_MINUTES)
            .await
        {
            ResetCode::delete_by_id(saved.id).exec(&self.db).await?;
            return Err(e.context("Failed to send reset code").into());
        }

        tracing::info!(email = %email, "Password reset code issued");
        Ok(())
    }

    pub async fn check_reset_code(&self, email: &str, code: &str) -> AppResult<()> {
        ensure_valid_code(&self.db, email, code).await
    }

    /// Verify the code, store the new password and burn every code for the address.
    pub async fn reset_password(&self, email: &str, code: &str, password: &str) -> AppResult<()> {
        let txn = self.db.begin().await?;

        ensure_valid_code(&txn, email, code).await?;

        let user = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let mut active: user::ActiveModel = user.into();
        active.password_hash = sea_orm::ActiveValue::Set(hash_password(password)?);
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        active.update(&txn).await?;

        ResetCode::delete_many()
            .filter(reset_code::Column::Email.eq(email))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        tracing::info!(email = %email, "Password reset completed");
        Ok(())
    }
}

fn check_credentials(user: Option<UserModel>, password: &str) -> AppResult<UserModel> {
    match user {
        Some(user) if verify_password(password, &user.password_hash) => Ok(user),
        _ => Err(AppError::InvalidCredentials),
    }
}

/// Only the newest unexpired code for an address counts.
async fn ensure_valid_code<C: ConnectionTrait>(db: &C, email: &str, code: &str) -> AppResult<()> {
    let now = chrono::Utc::now().naive_utc();
    let latest = ResetCode::find()
        .filter(reset_code::Column::Email.eq(email))
        .filter(reset_code::Column::ExpiresAt.gt(now))
        .order_by_desc(reset_code::Column::CreatedAt)
        .one(db)
        .await?;

    match latest {
        Some(saved) if codes_match(&saved.code, code) => Ok(()),
        _ => Err(AppError::Validation("Invalid or expired code".to_string())),
    }
}
