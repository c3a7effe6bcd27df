use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row};

use crate::{Batch, ChosenRow, Error, ListingParams, error::Result};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateReview {
    #[garde(length(min = 1, max = 10000))]
    pub text: String,
    #[garde(range(min = 1, max = 10))]
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateReview {
    #[garde(inner(length(min = 1, max = 10000)))]
    pub text: Option<String>,
    #[garde(inner(range(min = 1, max = 10)))]
    pub score: Option<i64>,
}

/// Author is exposed by username; the publication date is set at insert
/// and never updated.
#[derive(Debug, Serialize, Clone)]
pub struct Review {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub score: i64,
    pub pub_date: time::PrimitiveDateTime,
    #[serde(skip_serializing)]
    pub author_id: i64,
    #[serde(skip_serializing)]
    pub title_id: i64,
}

impl sqlx::FromRow<'_, ChosenRow> for Review {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(Review {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            author: row.try_get("author")?,
            score: row.try_get("score")?,
            pub_date: row.try_get("pub_date")?,
            author_id: row.try_get("author_id")?,
            title_id: row.try_get("title_id")?,
        })
    }
}

const REVIEW_SELECT: &str = "SELECT r.id, r.text, r.score, r.pub_date, r.author_id, r.title_id, \
    u.username AS author FROM review r JOIN users u ON r.author_id = u.id";

pub type ReviewRepository = ReviewRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// One review per (title, author). Checked here against persisted
    /// state; the UNIQUE constraint settles concurrent creates.
    pub async fn create(
        &self,
        title_id: i64,
        author_id: i64,
        payload: CreateReview,
    ) -> Result<Review> {
        if self.exists_for(title_id, author_id).await? {
            return Err(Error::DuplicateReview {
                title_id,
                author_id,
            });
        }
        let result =
            sqlx::query("INSERT INTO review (title_id, author_id, text, score) VALUES (?, ?, ?, ?)")
                .bind(title_id)
                .bind(author_id)
                .bind(&payload.text)
                .bind(payload.score)
                .execute(&self.executor)
                .await?;
        self.get_for_title(title_id, result.last_insert_rowid())
            .await
    }

    pub async fn exists_for(&self, title_id: i64, author_id: i64) -> Result<bool> {
        let found =
            sqlx::query_scalar::<_, i64>("SELECT id FROM review WHERE title_id = ? AND author_id = ?")
                .bind(title_id)
                .bind(author_id)
                .fetch_optional(&self.executor)
                .await?;
        Ok(found.is_some())
    }

    /// Lookup scoped by the parent title - a review id from another title
    /// is not found here.
    pub async fn get_for_title(&self, title_id: i64, review_id: i64) -> Result<Review> {
        sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = ? AND r.title_id = ?"))
            .bind(review_id)
            .bind(title_id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Review".to_string()))
    }

    pub async fn list_for_title(
        &self,
        title_id: i64,
        params: ListingParams,
    ) -> Result<Batch<Review>> {
        let ordering = params.ordering(&["id", "score", "pub_date"])?;
        let ordering = if ordering.is_empty() {
            "r.id".to_string()
        } else {
            ordering
        };
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM review WHERE title_id = ?")
            .bind(title_id)
            .fetch_one(&self.executor)
            .await?;
        let rows = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.title_id = ? ORDER BY {ordering} LIMIT ? OFFSET ?"
        ))
        .bind(title_id)
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
        title_id: i64,
        review_id: i64,
        payload: UpdateReview,
    ) -> Result<Review> {
        let current = self.get_for_title(title_id, review_id).await?;
        let text = payload.text.unwrap_or(current.text);
        let score = payload.score.unwrap_or(current.score);
        sqlx::query("UPDATE review SET text = ?, score = ? WHERE id = ?")
            .bind(&text)
            .bind(score)
            .bind(review_id)
            .execute(&self.executor)
            .await?;
        self.get_for_title(title_id, review_id).await
    }

    pub async fn delete(&self, title_id: i64, review_id: i64) -> Result<()> {
        self.get_for_title(title_id, review_id).await?;
        sqlx::query("DELETE FROM review WHERE id = ?")
            .bind(review_id)
            .execute(&self.executor)
            .await?;
        Ok(())
    }
}
