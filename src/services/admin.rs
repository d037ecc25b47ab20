use crate::{
    error::{AppError, AppResult},
    models::{
        comment, comment_reaction, question, reset_code, Comment, CommentReaction, Question,
        ResetCode, User,
    },
    services::upload::{UploadConfig, UploadService},
};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    TransactionTrait,
};
use uuid::Uuid;

pub const ACTIVITY_MONTHS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    pub users: u64,
    pub questions: u64,
    pub comments: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyActivity {
    pub month: String,
    pub questions: u64,
    pub comments: u64,
}

/// Half-open `[start, end)` range covering one calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthWindow {
    pub label: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

pub struct AdminService {
    db: DatabaseConnection,
}

impl AdminService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn statistics(&self) -> AppResult<Statistics> {
        Ok(Statistics {
            users: User::find().count(&self.db).await?,
            questions: Question::find().count(&self.db).await?,
            comments: Comment::find().count(&self.db).await?,
        })
    }

    /// Question and comment counts for the current month and the five before it, newest first.
    pub async fn monthly_activity(&self, today: NaiveDate) -> AppResult<Vec<MonthlyActivity>> {
        let mut activity = Vec::with_capacity(ACTIVITY_MONTHS);
        for window in month_windows(today, ACTIVITY_MONTHS) {
            let questions = Question::find()
                .filter(question::Column::CreatedAt.gte(window.start))
                .filter(question::Column::CreatedAt.lt(window.end))
                .count(&self.db)
                .await?;
            let comments = Comment::find()
                .filter(comment::Column::CreatedAt.gte(window.start))
                .filter(comment::Column::CreatedAt.lt(window.end))
                .count(&self.db)
                .await?;
            activity.push(MonthlyActivity {
                month: window.label,
                questions,
                comments,
            });
        }
        Ok(activity)
    }

    /// Remove a user and everything they wrote in one transaction, then clean up their files.
    pub async fn delete_user(
        &self,
        admin_id: Uuid,
        target_id: Uuid,
        uploads: &UploadConfig,
    ) -> AppResult<()> {
        if admin_id == target_id {
            return Err(AppError::Validation(
                "Administrators cannot delete their own account".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let user = User::find_by_id(target_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let questions = Question::find()
            .filter(question::Column::UserId.eq(target_id))
            .all(&txn)
            .await?;
        let question_ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();

        // Their comments, plus other people's comments that die with their questions.
        let comments = Comment::find()
            .filter(
                Condition::any()
                    .add(comment::Column::UserId.eq(target_id))
                    .add(comment::Column::QuestionId.is_in(question_ids)),
            )
            .all(&txn)
            .await?;

        let mut orphaned: Vec<String> = user.avatar.iter().cloned().collect();
        orphaned.extend(questions.into_iter().flat_map(|q| q.images));
        orphaned.extend(comments.into_iter().flat_map(|c| c.images));

        CommentReaction::delete_many()
            .filter(comment_reaction::Column::UserId.eq(target_id))
            .exec(&txn)
            .await?;
        Comment::delete_many()
            .filter(comment::Column::UserId.eq(target_id))
            .exec(&txn)
            .await?;
        Question::delete_many()
            .filter(question::Column::UserId.eq(target_id))
            .exec(&txn)
            .await?;
        ResetCode::delete_many()
            .filter(reset_code::Column::Email.eq(user.email.clone()))
            .exec(&txn)
            .await?;
        User::delete_by_id(target_id).exec(&txn).await?;

        txn.commit().await?;

        UploadService::remove_all(uploads, &orphaned).await;
        tracing::info!(user_id = %target_id, by = %admin_id, "User deleted by admin");
        Ok(())
    }
}

/// Windows for the month containing `today` and the `count - 1` months before it.
pub fn month_windows(today: NaiveDate, count: usize) -> Vec<MonthWindow> {
    let mut year = today.year();
    let mut month = today.month();
    let mut windows = Vec::with_capacity(count);

    for _ in 0..count {
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        windows.push(MonthWindow {
            label: format!("{:04}-{:02}", year, month),
            start: first_of_month(year, month),
            end: first_of_month(next_year, next_month),
        });

        (year, month) = if month == 1 {
            (year - 1, 12)
        } else {
            (year, month - 1)
        };
    }
    windows
}

fn first_of_month(year: i32, month: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}
