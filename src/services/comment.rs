use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{comment, Comment, CommentModel, Question, UserModel},
    services::{
        reaction::{counts_for, ReactionCounts},
        upload::{file_names, PendingImage, UploadConfig, UploadService},
        user::users_by_ids,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CommentDetails {
    pub comment: CommentModel,
    pub author: Option<UserModel>,
    pub reactions: ReactionCounts,
}

pub struct CommentService {
    db: DatabaseConnection,
}

impl CommentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Comments of a question, newest first.
    pub async fn list_for_question(&self, question_id: Uuid) -> AppResult<Vec<CommentDetails>> {
        self.ensure_question(question_id).await?;

        let comments = Comment::find()
            .filter(comment::Column::QuestionId.eq(question_id))
            .order_by_desc(comment::Column::CreatedAt)
            .all(&self.db)
            .await?;
        self.with_details(comments).await
    }

    pub async fn create(
        &self,
        question_id: Uuid,
        user_id: Uuid,
        content: String,
        images: Vec<PendingImage>,
        uploads: &UploadConfig,
    ) -> AppResult<CommentDetails> {
        self.ensure_question(question_id).await?;

        let txn = self.db.begin().await?;
        let now = chrono::Utc::now().naive_utc();

        let comment = comment::ActiveModel {
            id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
            question_id: sea_orm::ActiveValue::Set(question_id),
            user_id: sea_orm::ActiveValue::Set(user_id),
            content: sea_orm::ActiveValue::Set(content),
            images: sea_orm::ActiveValue::Set(file_names(&images)),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
        }
        .insert(&txn)
        .await?;

        UploadService::store_all(uploads, &images).await?;

        if let Err(e) = txn.commit().await {
            UploadService::remove_all(uploads, &comment.images).await;
            return Err(e.into());
        }

        self.details_of(comment).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        auth_user: &AuthUser,
        content: String,
    ) -> AppResult<CommentDetails> {
        let existing = self.get_by_id(id).await?;
        auth_user.ensure_can_modify(existing.user_id)?;

        let mut active: comment::ActiveModel = existing.into();
        active.content = sea_orm::ActiveValue::Set(content);
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&self.db).await?;

        self.details_of(updated).await
    }

    pub async fn delete(&self, id: Uuid, auth_user: &AuthUser, uploads: &UploadConfig) -> AppResult<()> {
        let existing = self.get_by_id(id).await?;
        auth_user.ensure_can_modify(existing.user_id)?;

        Comment::delete_by_id(id).exec(&self.db).await?;
        UploadService::remove_all(uploads, &existing.images).await;
        Ok(())
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<CommentModel> {
        Comment::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))
    }

    async fn ensure_question(&self, question_id: Uuid) -> AppResult<()> {
        Question::find_by_id(question_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Question"))?;
        Ok(())
    }

    async fn details_of(&self, comment: CommentModel) -> AppResult<CommentDetails> {
        let mut details = self.with_details(vec![comment]).await?;
        details
            .pop()
            .ok_or_else(|| anyhow::anyhow!("comment details went missing").into())
    }

    async fn with_details(&self, comments: Vec<CommentModel>) -> AppResult<Vec<CommentDetails>> {
        let ids: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
        let mut counts = counts_for(&self.db, &ids).await?;
        let authors = users_by_ids(&self.db, comments.iter().map(|c| c.user_id)).await?;

        Ok(comments
            .into_iter()
            .map(|comment| CommentDetails {
                reactions: counts.remove(&comment.id).unwrap_or_default(),
                author: authors.get(&comment.user_id).cloned(),
                comment,
            })
            .collect())
    }
}
