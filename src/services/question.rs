use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{comment, question, Comment, Question, QuestionModel, TagModel, User, UserModel},
    services::{
        tag::{ensure_tags_exist, set_question_tags, tagged_with_any, tags_for_questions},
        upload::{file_names, PendingImage, UploadConfig, UploadService},
        user::users_by_ids,
    },
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

/// A question together with its tags and author.
#[derive(Debug, Clone)]
pub struct QuestionDetails {
    pub question: QuestionModel,
    pub tags: Vec<TagModel>,
    pub author: Option<UserModel>,
}

#[derive(Debug, Clone)]
pub struct QuestionFilter {
    /// Lowercase tag names; a question matches when it carries any of them.
    pub tags: Vec<String>,
    pub ascending: bool,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug)]
pub struct NewQuestion {
    pub header: String,
    pub content: String,
    pub tag_ids: Vec<Uuid>,
    pub images: Vec<PendingImage>,
}

#[derive(Debug, Default)]
pub struct QuestionChanges {
    pub header: Option<String>,
    pub content: Option<String>,
    pub tag_ids: Option<Vec<Uuid>>,
}

pub struct QuestionService {
    db: DatabaseConnection,
}

impl QuestionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: &QuestionFilter) -> AppResult<(Vec<QuestionDetails>, u64)> {
        let mut query = Question::find();

        if !filter.tags.is_empty() {
            query = query.filter(tagged_with_any(&filter.tags));
        }

        let total = query.clone().count(&self.db).await?;

        let query = if filter.ascending {
            query.order_by_asc(question::Column::CreatedAt)
        } else {
            query.order_by_desc(question::Column::CreatedAt)
        };
        let questions = query
            .offset(filter.offset)
            .limit(filter.limit)
            .all(&self.db)
            .await?;

        Ok((self.with_details(questions).await?, total))
    }

    /// Bump the view counter, then load the question.
    pub async fn view(&self, id: Uuid) -> AppResult<QuestionDetails> {
        let result = Question::update_many()
            .col_expr(
                question::Column::ViewsCount,
                Expr::col(question::Column::ViewsCount).add(1),
            )
            .filter(question::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Question"));
        }

        let question = self.get_by_id(id).await?;
        self.details_of(question).await
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<QuestionDetails>> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let questions = Question::find()
            .filter(question::Column::UserId.eq(user_id))
            .order_by_desc(question::Column::CreatedAt)
            .all(&self.db)
            .await?;
        self.with_details(questions).await
    }

    /// Insert the question, its tag links and its image files as one unit.
    pub async fn create(
        &self,
        user_id: Uuid,
        input: NewQuestion,
        uploads: &UploadConfig,
    ) -> AppResult<QuestionDetails> {
        let txn = self.db.begin().await?;

        ensure_tags_exist(&txn, &input.tag_ids).await?;

        let now = chrono::Utc::now().naive_utc();
        let question = question::ActiveModel {
            id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
            header: sea_orm::ActiveValue::Set(input.header),
            content: sea_orm::ActiveValue::Set(input.content),
            images: sea_orm::ActiveValue::Set(file_names(&input.images)),
            user_id: sea_orm::ActiveValue::Set(user_id),
            views_count: sea_orm::ActiveValue::Set(0),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
        }
        .insert(&txn)
        .await?;

        set_question_tags(&txn, question.id, &input.tag_ids).await?;

        // Dropping the transaction on error rolls the row back.
        UploadService::store_all(uploads, &input.images).await?;

        if let Err(e) = txn.commit().await {
            UploadService::remove_all(uploads, &question.images).await;
            return Err(e.into());
        }

        tracing::info!(question_id = %question.id, user_id = %user_id, "Question created");
        self.details_of(question).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        auth_user: &AuthUser,
        changes: QuestionChanges,
    ) -> AppResult<QuestionDetails> {
        let existing = self.get_by_id(id).await?;
        auth_user.ensure_can_modify(existing.user_id)?;

        let txn = self.db.begin().await?;

        if let Some(tag_ids) = &changes.tag_ids {
            ensure_tags_exist(&txn, tag_ids).await?;
            set_question_tags(&txn, id, tag_ids).await?;
        }

        let mut active: question::ActiveModel = existing.into();
        if let Some(header) = changes.header {
            active.header = sea_orm::ActiveValue::Set(header);
        }
        if let Some(content) = changes.content {
            active.content = sea_orm::ActiveValue::Set(content);
        }
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        self.details_of(updated).await
    }

    /// Delete a question with its comments, reactions and image files.
    pub async fn delete(&self, id: Uuid, auth_user: &AuthUser, uploads: &UploadConfig) -> AppResult<()> {
        let existing = self.get_by_id(id).await?;
        auth_user.ensure_can_modify(existing.user_id)?;

        let mut orphaned = existing.images.clone();
        orphaned.extend(
            Comment::find()
                .filter(comment::Column::QuestionId.eq(id))
                .all(&self.db)
                .await?
                .into_iter()
                .flat_map(|c| c.images),
        );

        Question::delete_by_id(id).exec(&self.db).await?;
        UploadService::remove_all(uploads, &orphaned).await;

        tracing::info!(question_id = %id, by = %auth_user.user_id, "Question deleted");
        Ok(())
    }

    /// Detach the named images from a question and delete their files.
    /// Names the question does not carry are ignored.
    pub async fn delete_images(
        &self,
        id: Uuid,
        auth_user: &AuthUser,
        names: &[String],
        uploads: &UploadConfig,
    ) -> AppResult<QuestionDetails> {
        let existing = self.get_by_id(id).await?;
        auth_user.ensure_can_modify(existing.user_id)?;

        let (kept, removed) = split_images(&existing.images, names);
        if removed.is_empty() {
            return self.details_of(existing).await;
        }

        let mut active: question::ActiveModel = existing.into();
        active.images = sea_orm::ActiveValue::Set(kept);
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&self.db).await?;

        UploadService::remove_all(uploads, &removed).await;
        self.details_of(updated).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<QuestionModel> {
        Question::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Question"))
    }

    async fn details_of(&self, question: QuestionModel) -> AppResult<QuestionDetails> {
        let mut details = self.with_details(vec![question]).await?;
        details
            .pop()
            .ok_or_else(|| anyhow::anyhow!("question details went missing").into())
    }

    async fn with_details(&self, questions: Vec<QuestionModel>) -> AppResult<Vec<QuestionDetails>> {
        let ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        let mut tags = tags_for_questions(&self.db, &ids).await?;
        let authors = users_by_ids(&self.db, questions.iter().map(|q| q.user_id)).await?;

        Ok(questions
            .into_iter()
            .map(|question| QuestionDetails {
                tags: tags.remove(&question.id).unwrap_or_default(),
                author: authors.get(&question.user_id).cloned(),
                question,
            })
            .collect())
    }
}

/// Partition `current` into the images to keep and the ones named in `to_remove`.
pub fn split_images(current: &[String], to_remove: &[String]) -> (Vec<String>, Vec<String>) {
    current
        .iter()
        .cloned()
        .partition(|name| !to_remove.contains(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn removes_only_named_images() {
        let (kept, removed) = split_images(&names(&["a.png", "b.jpg", "c.png"]), &names(&["b.jpg"]));
        assert_eq!(kept, names(&["a.png", "c.png"]));
        assert_eq!(removed, names(&["b.jpg"]));
    }

    #[test]
    fn unknown_names_are_ignored() {
        let (kept, removed) = split_images(&names(&["a.png"]), &names(&["../etc/passwd", "z.png"]));
        assert_eq!(kept, names(&["a.png"]));
        assert!(removed.is_empty());
    }
}
