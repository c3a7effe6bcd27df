use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Pool;

use crate::{Batch, Error, ListingParams, category::like_escape, error::Result};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateGenre {
    #[garde(length(min = 1, max = 256))]
    pub name: String,
    #[garde(length(min = 1, max = 50), pattern(r"^[-a-zA-Z0-9_]+$"))]
    pub slug: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Genre {
    #[serde(skip_serializing)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

pub type GenreRepository = GenreRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct GenreRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> GenreRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateGenre) -> Result<Genre> {
        let result = sqlx::query("INSERT INTO genre (name, slug) VALUES (?, ?)")
            .bind(&payload.name)
            .bind(&payload.slug)
            .execute(&self.executor)
            .await?;
        self.get(result.last_insert_rowid()).await
    }

    pub async fn get(&self, id: i64) -> Result<Genre> {
        sqlx::query_as::<_, Genre>("SELECT id, name, slug FROM genre WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Genre".to_string()))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Genre> {
        sqlx::query_as::<_, Genre>("SELECT id, name, slug FROM genre WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Genre".to_string()))
    }

    pub async fn list(&self, search: Option<&str>, params: ListingParams) -> Result<Batch<Genre>> {
        let ordering = params.ordering(&["name", "slug"])?;
        let ordering = if ordering.is_empty() {
            "name DESC".to_string()
        } else {
            ordering
        };
        let pattern = search.map(|s| format!("%{}%", like_escape(s)));
        let condition = if pattern.is_some() {
            "WHERE name LIKE ? ESCAPE '\\'"
        } else {
            ""
        };

        let count_sql = format!("SELECT COUNT(*) FROM genre {condition}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(pattern) = &pattern {
            count_query = count_query.bind(pattern);
        }
        let total = count_query.fetch_one(&self.executor).await?;

        let rows_sql = format!(
            "SELECT id, name, slug FROM genre {condition} ORDER BY {ordering} LIMIT ? OFFSET ?"
        );
        let mut rows_query = sqlx::query_as::<_, Genre>(&rows_sql);
        if let Some(pattern) = &pattern {
            rows_query = rows_query.bind(pattern);
        }
        let rows = rows_query
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

    pub async fn delete_by_slug(&self, slug: &str) -> Result<()> {
        let existing = self.get_by_slug(slug).await?;
        sqlx::query("DELETE FROM genre WHERE id = ?")
            .bind(existing.id)
            .execute(&self.executor)
            .await?;
        Ok(())
    }
}
