use crate::{
    error::{AppError, AppResult},
    models::{comment_reaction, Comment, CommentReaction},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    EntityTrait, QueryFilter, QuerySelect, Statement, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    fn is_like(self) -> bool {
        matches!(self, ReactionKind::Like)
    }
}

/// What a toggle does to the single (user, comment) row. `R` is the
/// existing row, carried into the arms that touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction<R> {
    Insert { is_like: bool },
    Delete(R),
    Flip { row: R, is_like: bool },
}

/// Absent becomes the requested reaction, the same reaction again removes it,
/// the opposite reaction flips it.
pub fn plan_toggle<R>(existing: Option<(R, bool)>, requested: ReactionKind) -> ToggleAction<R> {
    let wanted = requested.is_like();
    match existing {
        None => ToggleAction::Insert { is_like: wanted },
        Some((row, current)) if current == wanted => ToggleAction::Delete(row),
        Some((row, _)) => ToggleAction::Flip { row, is_like: wanted },
    }
}

/// The caller's reaction after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReactionState {
    Like,
    Dislike,
    None,
}

impl<R> From<&ToggleAction<R>> for ReactionState {
    fn from(action: &ToggleAction<R>) -> Self {
        match action {
            ToggleAction::Delete(_) => ReactionState::None,
            ToggleAction::Insert { is_like } | ToggleAction::Flip { is_like, .. } => {
                if *is_like {
                    ReactionState::Like
                } else {
                    ReactionState::Dislike
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReactionCounts {
    pub like_count: i64,
    pub dislike_count: i64,
}

pub struct ReactionService {
    db: DatabaseConnection,
}

impl ReactionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Apply a like/dislike toggle for `user_id` on a comment.
    ///
    /// The comment row is locked for the duration of the transaction, so
    /// concurrent toggles on the same comment run one after another and the
    /// last one to commit wins.
    pub async fn toggle(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> AppResult<(ReactionState, ReactionCounts)> {
        let txn = self.db.begin().await?;

        Comment::find_by_id(comment_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))?;

        let existing = CommentReaction::find()
            .filter(comment_reaction::Column::CommentId.eq(comment_id))
            .filter(comment_reaction::Column::UserId.eq(user_id))
            .one(&txn)
            .await?;

        let existing = existing.map(|row| {
            let is_like = row.is_like;
            (row, is_like)
        });
        let action = plan_toggle(existing, kind);
        let state = ReactionState::from(&action);
        let now = chrono::Utc::now().naive_utc();

        match action {
            ToggleAction::Insert { is_like } => {
                comment_reaction::ActiveModel {
                    id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
                    comment_id: sea_orm::ActiveValue::Set(comment_id),
                    user_id: sea_orm::ActiveValue::Set(user_id),
                    is_like: sea_orm::ActiveValue::Set(is_like),
                    created_at: sea_orm::ActiveValue::Set(now),
                    updated_at: sea_orm::ActiveValue::Set(now),
                }
                .insert(&txn)
                .await?;
            }
            ToggleAction::Delete(row) => {
                CommentReaction::delete_by_id(row.id).exec(&txn).await?;
            }
            ToggleAction::Flip { row, is_like } => {
                let mut active: comment_reaction::ActiveModel = row.into();
                active.is_like = sea_orm::ActiveValue::Set(is_like);
                active.updated_at = sea_orm::ActiveValue::Set(now);
                active.update(&txn).await?;
            }
        }

        let counts = counts_for(&txn, &[comment_id])
            .await?
            .remove(&comment_id)
            .unwrap_or_default();

        txn.commit().await?;
        Ok((state, counts))
    }

    pub async fn counts(&self, comment_id: Uuid) -> AppResult<ReactionCounts> {
        Comment::find_by_id(comment_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))?;

        Ok(counts_for(&self.db, &[comment_id])
            .await?
            .remove(&comment_id)
            .unwrap_or_default())
    }
}

/// Like and dislike totals per comment. Comments without reactions are absent.
pub async fn counts_for<C: ConnectionTrait>(
    db: &C,
    comment_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, ReactionCounts>> {
    if comment_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=comment_ids.len()).map(|i| format!("${}", i)).collect();
    let sql = format!(
        "SELECT comment_id,
                COUNT(*) FILTER (WHERE is_like) AS like_count,
                COUNT(*) FILTER (WHERE NOT is_like) AS dislike_count
         FROM comment_reactions
         WHERE comment_id IN ({})
         GROUP BY comment_id",
        placeholders.join(", ")
    );
    let values: Vec<sea_orm::Value> = comment_ids.iter().map(|id| (*id).into()).collect();

    let rows = db
        .query_all(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            &sql,
            values,
        ))
        .await?;

    let mut counts = HashMap::new();
    for row in rows {
        let comment_id: Uuid = row.try_get("", "comment_id")?;
        counts.insert(
            comment_id,
            ReactionCounts {
                like_count: row.try_get("", "like_count")?,
                dislike_count: row.try_get("", "dislike_count")?,
            },
        );
    }
    Ok(counts)
}
