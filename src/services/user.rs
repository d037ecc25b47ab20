use crate::{
    error::{AppError, AppResult},
    models::{user, User, UserModel},
    utils::hash_password,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder,
};
use std::collections::HashMap;
use uuid::Uuid;

/// Profile fields a user may change. `None` leaves the column as is.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub lastname: Option<String>,
    pub nickname: Option<String>,
    pub website: Option<String>,
    pub about: Option<String>,
    pub email: Option<String>,
    pub tel: Option<String>,
    pub password: Option<String>,
}

pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<UserModel> {
        User::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    pub async fn list(&self) -> AppResult<Vec<UserModel>> {
        let users = User::find()
            .order_by_desc(user::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(users)
    }

    pub async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<UserModel> {
        let existing = self.get_by_id(id).await?;

        let clashes = find_identity_clashes(
            &self.db,
            changes.nickname.as_deref(),
            changes.email.as_deref(),
            changes.tel.as_deref(),
            Some(id),
        )
        .await?;
        if !clashes.is_empty() {
            return Err(AppError::InvalidFields(clashes));
        }

        let mut active: user::ActiveModel = existing.into();
        if let Some(v) = changes.name {
            active.name = sea_orm::ActiveValue::Set(v);
        }
        if let Some(v) = changes.lastname {
            active.lastname = sea_orm::ActiveValue::Set(v);
        }
        if let Some(v) = changes.nickname {
            active.nickname = sea_orm::ActiveValue::Set(v);
        }
        if let Some(v) = changes.website {
            active.website = sea_orm::ActiveValue::Set(v);
        }
        if let Some(v) = changes.about {
            active.about = sea_orm::ActiveValue::Set(v);
        }
        if let Some(v) = changes.email {
            active.email = sea_orm::ActiveValue::Set(v);
        }
        if let Some(v) = changes.tel {
            active.tel = sea_orm::ActiveValue::Set(v);
        }
        if let Some(password) = changes.password {
            active.password_hash = sea_orm::ActiveValue::Set(hash_password(&password)?);
        }
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());

        active.update(&self.db).await.map_err(|e| {
            AppError::from_unique_violation(e, "'nickname', 'email' or 'tel' is already in use")
        })
    }

    /// Point the avatar at a freshly stored file. Returns the updated user and
    /// the previous file name, which the caller should remove.
    pub async fn set_avatar(
        &self,
        id: Uuid,
        file_name: &str,
    ) -> AppResult<(UserModel, Option<String>)> {
        let existing = self.get_by_id(id).await?;
        let previous = existing.avatar.clone();

        let mut active: user::ActiveModel = existing.into();
        active.avatar = sea_orm::ActiveValue::Set(Some(file_name.to_string()));
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&self.db).await?;

        Ok((updated, previous))
    }

    /// Clear the avatar and return the file name that was removed from the profile.
    pub async fn clear_avatar(&self, id: Uuid) -> AppResult<String> {
        let existing = self.get_by_id(id).await?;
        let Some(previous) = existing.avatar.clone() else {
            return Err(AppError::Validation("No avatar to delete".to_string()));
        };

        let mut active: user::ActiveModel = existing.into();
        active.avatar = sea_orm::ActiveValue::Set(None);
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        active.update(&self.db).await?;

        Ok(previous)
    }
}

/// Load the users behind a set of author ids.
pub async fn users_by_ids<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, UserModel>> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = User::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

/// One message per identity field already taken by another account.
pub async fn find_identity_clashes<C: ConnectionTrait>(
    db: &C,
    nickname: Option<&str>,
    email: Option<&str>,
    tel: Option<&str>,
    exclude: Option<Uuid>,
) -> AppResult<Vec<String>> {
    let mut any = Condition::any();
    if let Some(nickname) = nickname {
        any = any.add(user::Column::Nickname.eq(nickname));
    }
    if let Some(email) = email {
        any = any.add(user::Column::Email.eq(email));
    }
    if let Some(tel) = tel {
        any = any.add(user::Column::Tel.eq(tel));
    }
    if any.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = User::find().filter(any);
    if let Some(id) = exclude {
        query = query.filter(user::Column::Id.ne(id));
    }
    let others = query.all(db).await?;

    Ok(describe_clashes(&others, nickname, email, tel))
}

fn describe_clashes(
    others: &[UserModel],
    nickname: Option<&str>,
    email: Option<&str>,
    tel: Option<&str>,
) -> Vec<String> {
    let mut clashes = Vec::new();
    if nickname.is_some_and(|n| others.iter().any(|u| u.nickname == n)) {
        clashes.push("'nickname' is already in use".to_string());
    }
    if email.is_some_and(|e| others.iter().any(|u| u.email == e)) {
        clashes.push("'email' is already in use".to_string());
    }
    if tel.is_some_and(|t| others.iter().any(|u| u.tel == t)) {
        clashes.push("'tel' is already in use".to_string());
    }
    clashes
}
