use crate::config::env_flag;
use crate::error::AppResult;
use crate::models::user::{self, ROLE_ADMIN};
use crate::models::User;
use crate::utils::hash_password;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter};
use std::env;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BootstrapAdminConfig {
    pub nickname: String,
    pub email: String,
    pub password: String,
    pub tel: String,
}

impl BootstrapAdminConfig {
    pub fn from_env() -> Option<Self> {
        if !env_flag("BOOTSTRAP_ADMIN_ENABLED", false) {
            return None;
        }

        Some(Self {
            nickname: env::var("BOOTSTRAP_ADMIN_NICKNAME").ok()?,
            email: env::var("BOOTSTRAP_ADMIN_EMAIL").ok()?,
            password: env::var("BOOTSTRAP_ADMIN_PASSWORD").ok()?,
            tel: env::var("BOOTSTRAP_ADMIN_TEL").unwrap_or_default(),
        })
    }
}

/// 启动时自动创建/提升管理员：
/// - 若库中已存在任意 admin：不做任何事
/// - 否则若配置的 email/nickname 已存在：提升为 admin
/// - 否则创建一个新的 admin
pub async fn ensure_bootstrap_admin(db: &DatabaseConnection) -> AppResult<()> {
    let Some(cfg) = BootstrapAdminConfig::from_env() else {
        return Ok(());
    };

    let admin_exists = User::find()
        .filter(user::Column::Role.eq(ROLE_ADMIN))
        .one(db)
        .await?
        .is_some();
    if admin_exists {
        return Ok(());
    }

    let existing = User::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(cfg.email.clone()))
                .add(user::Column::Nickname.eq(cfg.nickname.clone())),
        )
        .one(db)
        .await?;

    let now = chrono::Utc::now().naive_utc();

    if let Some(existing) = existing {
        let user_id = existing.id;
        let mut active: user::ActiveModel = existing.into();
        active.role = sea_orm::ActiveValue::Set(ROLE_ADMIN.to_string());
        active.updated_at = sea_orm::ActiveValue::Set(now);
        active.update(db).await?;
        tracing::info!(%user_id, "Promoted existing user to admin");
        return Ok(());
    }

    let password_hash = hash_password(&cfg.password)?;
    let tel = if cfg.tel.is_empty() {
        format!("admin-{}", Uuid::new_v4().simple())
    } else {
        cfg.tel
    };

    let admin = user::ActiveModel {
        id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
        name: sea_orm::ActiveValue::Set(String::new()),
        lastname: sea_orm::ActiveValue::Set(String::new()),
        nickname: sea_orm::ActiveValue::Set(cfg.nickname),
        website: sea_orm::ActiveValue::Set(String::new()),
        about: sea_orm::ActiveValue::Set(String::new()),
        email: sea_orm::ActiveValue::Set(cfg.email),
        tel: sea_orm::ActiveValue::Set(tel),
        password_hash: sea_orm::ActiveValue::Set(password_hash),
        role: sea_orm::ActiveValue::Set(ROLE_ADMIN.to_string()),
        avatar: sea_orm::ActiveValue::Set(None),
        created_at: sea_orm::ActiveValue::Set(now),
        updated_at: sea_orm::ActiveValue::Set(now),
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = %admin.id, "Bootstrap admin created");
    Ok(())
}
