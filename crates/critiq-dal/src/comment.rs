use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row};

use crate::{Batch, ChosenRow, Error, ListingParams, error::Result};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateComment {
    #[garde(length(min = 1, max = 10000))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateComment {
    #[garde(inner(length(min = 1, max = 10000)))]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub pub_date: time::PrimitiveDateTime,
    #[serde(skip_serializing)]
    pub author_id: i64,
    #[serde(skip_serializing)]
    pub review_id: i64,
}

impl sqlx::FromRow<'_, ChosenRow> for Comment {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(Comment {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            author: row.try_get("author")?,
            pub_date: row.try_get("pub_date")?,
            author_id: row.try_get("author_id")?,
            review_id: row.try_get("review_id")?,
        })
    }
}

const COMMENT_SELECT: &str = "SELECT c.id, c.text, c.pub_date, c.author_id, c.review_id, \
    u.username AS author FROM comment c JOIN users u ON c.author_id = u.id";

pub type CommentRepository = CommentRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct CommentRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> CommentRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn review_exists(&self, review_id: i64) -> Result<()> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM review WHERE id = ?")
            .bind(review_id)
            .fetch_optional(&self.executor)
            .await?
            .map(|_| ())
            .ok_or_else(|| Error::RecordNotFound("Review".to_string()))
    }

    pub async fn create(
        &self,
        review_id: i64,
        author_id: i64,
        payload: CreateComment,
    ) -> Result<Comment> {
        self.review_exists(review_id).await?;
        let result = sqlx::query("INSERT INTO comment (review_id, author_id, text) VALUES (?, ?, ?)")
            .bind(review_id)
            .bind(author_id)
            .bind(&payload.text)
            .execute(&self.executor)
            .await?;
        self.get_for_review(review_id, result.last_insert_rowid())
            .await
    }

    pub async fn get_for_review(&self, review_id: i64, comment_id: i64) -> Result<Comment> {
        sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = ? AND c.review_id = ?"))
            .bind(comment_id)
            .bind(review_id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Comment".to_string()))
    }

    pub async fn list_for_review(
        &self,
        review_id: i64,
        params: ListingParams,
    ) -> Result<Batch<Comment>> {
        let ordering = params.ordering(&["id", "pub_date"])?;
        let ordering = if ordering.is_empty() {
            "c.id".to_string()
        } else {
            ordering
        };
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comment WHERE review_id = ?")
            .bind(review_id)
            .fetch_one(&self.executor)
            .await?;
        let rows = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.review_id = ? ORDER BY {ordering} LIMIT ? OFFSET ?"
        ))
        .bind(review_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&self.executor)
        .await?;
        Ok(Batch {
            offset: params.offset,
            total: total as u64,
            rows,
        })
    }

    pub async fn update(
        &self,
        review_id: i64,
        comment_id: i64,
        payload: UpdateComment,
    ) -> Result<Comment> {
        let current = self.get_for_review(review_id, comment_id).await?;
        let text = payload.text.unwrap_or(current.text);
        sqlx::query("UPDATE comment SET text = ? WHERE id = ?")
            .bind(&text)
            .bind(comment_id)
            .execute(&self.executor)
            .await?;
        self.get_for_review(review_id, comment_id).await
    }

    pub async fn delete(&self, review_id: i64, comment_id: i64) -> Result<()> {
        self.get_for_review(review_id, comment_id).await?;
        sqlx::query("DELETE FROM comment WHERE id = ?")
            .bind(comment_id)
            .execute(&self.executor)
            .await?;
        Ok(())
    }
}
