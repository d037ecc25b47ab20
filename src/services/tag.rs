use crate::{
    error::{AppError, AppResult},
    models::{question, question_tag, tag, QuestionTag, Tag, TagModel},
};
use sea_orm::{
    sea_query::SimpleExpr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, SqlErr,
};
use std::collections::HashMap;
use uuid::Uuid;

pub struct TagService {
    db: DatabaseConnection,
}

impl TagService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<TagModel>> {
        let tags = Tag::find()
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await?;
        Ok(tags)
    }

    pub async fn create(&self, name: &str) -> AppResult<TagModel> {
        let name = normalize_tag_name(name);
        if name.is_empty() {
            return Err(AppError::InvalidFields(vec![
                "'name' cannot be empty".to_string(),
            ]));
        }

        let tag = tag::ActiveModel {
            id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
            name: sea_orm::ActiveValue::Set(name),
            created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Validation("Tag already exists".to_string())
            }
            _ => AppError::Database(e),
        })?;

        tracing::info!(tag = %tag.name, "Tag created");
        Ok(tag)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = Tag::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Tag"));
        }
        Ok(())
    }
}

fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut unique = ids.to_vec();
    unique.sort();
    unique.dedup();
    unique
}

pub fn normalize_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Fail with a validation error unless every id names an existing tag.
pub async fn ensure_tags_exist<C: ConnectionTrait>(db: &C, ids: &[Uuid]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let unique = unique_ids(ids);
    let found = Tag::find()
        .filter(tag::Column::Id.is_in(unique.clone()))
        .all(db)
        .await?;
    if found.len() != unique.len() {
        return Err(AppError::Validation(
            "One or more tags do not exist".to_string(),
        ));
    }
    Ok(())
}

/// Replace the tag links of a question.
pub async fn set_question_tags<C: ConnectionTrait>(
    db: &C,
    question_id: Uuid,
    tag_ids: &[Uuid],
) -> AppResult<()> {
    QuestionTag::delete_many()
        .filter(question_tag::Column::QuestionId.eq(question_id))
        .exec(db)
        .await?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    let links = unique_ids(tag_ids)
        .into_iter()
        .map(|tag_id| question_tag::ActiveModel {
            question_id: sea_orm::ActiveValue::Set(question_id),
            tag_id: sea_orm::ActiveValue::Set(tag_id),
        });
    QuestionTag::insert_many(links).exec(db).await?;
    Ok(())
}

/// Tags of every question in `question_ids`, each list sorted by name.
pub async fn tags_for_questions<C: ConnectionTrait>(
    db: &C,
    question_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<TagModel>>> {
    if question_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let links = QuestionTag::find()
        .filter(question_tag::Column::QuestionId.is_in(question_ids.to_vec()))
        .all(db)
        .await?;
    if links.is_empty() {
        return Ok(HashMap::new());
    }

    let tag_ids: Vec<Uuid> = links.iter().map(|l| l.tag_id).collect();
    let tags: HashMap<Uuid, TagModel> = Tag::find()
        .filter(tag::Column::Id.is_in(tag_ids))
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    let mut by_question: HashMap<Uuid, Vec<TagModel>> = HashMap::new();
    for link in links {
        if let Some(tag) = tags.get(&link.tag_id) {
            by_question
                .entry(link.question_id)
                .or_default()
                .push(tag.clone());
        }
    }
    for list in by_question.values_mut() {
        list.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(by_question)
}

/// Condition matching questions tagged with any of `names` (already lowercase),
/// resolved inside the database as a subquery over the link table.
pub fn tagged_with_any(names: &[String]) -> SimpleExpr {
    question::Column::Id.in_subquery(
        QuestionTag::find()
            .select_only()
            .column(question_tag::Column::QuestionId)
            .inner_join(Tag)
            .filter(tag::Column::Name.is_in(names.iter().cloned()))
            .into_query(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_names_are_trimmed_and_lowercased() {
        assert_eq!(normalize_tag_name("  Rust "), "rust");
        assert_eq!(normalize_tag_name("WebAssembly"), "webassembly");
        assert_eq!(normalize_tag_name("   "), "");
    }

    #[test]
    fn tag_filter_stays_inside_the_database() {
        use sea_orm::DbBackend;

        let names = vec!["rust".to_string(), "tokio".to_string()];
        let sql = crate::models::Question::find()
            .filter(tagged_with_any(&names))
            .build(DbBackend::Postgres)
            .sql;
        assert!(sql.contains(r#""questions"."id" IN (SELECT "questions_tags"."question_id""#));
        assert!(sql.contains(r#"INNER JOIN "tags""#));
        assert!(sql.contains(r#""tags"."name" IN ($1, $2)"#));
    }

    #[test]
    fn duplicate_ids_collapse() {
        let id = Uuid::new_v4();
        assert_eq!(unique_ids(&[id, id]), vec![id]);
    }
}
