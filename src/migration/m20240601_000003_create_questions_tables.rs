use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE TABLE IF NOT EXISTS questions (
                id UUID PRIMARY KEY,
                header VARCHAR(255) NOT NULL,
                content TEXT NOT NULL,
                images VARCHAR(255)[] NOT NULL DEFAULT '{}',
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                views_count BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_questions_user_created ON questions(user_id, created_at DESC)",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_questions_created ON questions(created_at DESC)",
        )
        .await?;

        db.execute_unprepared(
            "CREATE TABLE IF NOT EXISTS questions_tags (
                question_id UUID NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
                tag_id UUID NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (question_id, tag_id)
            )",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_questions_tags_tag ON questions_tags(tag_id)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS questions_tags")
            .await?;
        db.execute_unprepared("DROP TABLE IF EXISTS questions")
            .await?;
        Ok(())
    }
}
