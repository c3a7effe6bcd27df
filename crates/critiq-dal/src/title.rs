use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, QueryBuilder, Row};

use crate::{
    Batch, ChosenRow, Error, ListingParams,
    category::{Category, like_escape},
    error::Result,
    genre::Genre,
};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateTitle {
    #[garde(length(min = 1, max = 256))]
    pub name: String,
    #[garde(range(min = 0))]
    pub year: i64,
    #[garde(inner(length(max = 5000)))]
    pub description: Option<String>,
    /// Genre slugs
    #[garde(inner(length(min = 1, max = 50)))]
    pub genre: Vec<String>,
    /// Category slug
    #[garde(inner(length(min = 1, max = 50)))]
    pub category: Option<String>,
}

/// Partial update - an absent field keeps the stored value, an explicit
/// null clears nullable ones.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateTitle {
    #[garde(inner(length(min = 1, max = 256)))]
    pub name: Option<String>,
    #[garde(inner(range(min = 0)))]
    pub year: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::double_option"
    )]
    #[garde(inner(inner(length(max = 5000))))]
    pub description: Option<Option<String>>,
    #[garde(inner(inner(length(min = 1, max = 50))))]
    pub genre: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::double_option"
    )]
    #[garde(inner(inner(length(min = 1, max = 50))))]
    pub category: Option<Option<String>>,
}

#[derive(Debug, Default, Clone)]
pub struct TitleFilter {
    pub category: Option<String>,
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i64>,
}

impl TitleFilter {
    fn is_empty(&self) -> bool {
        self.category.is_none() && self.genre.is_none() && self.name.is_none() && self.year.is_none()
    }
}

/// Read shape - nested category and genres, plus the derived rating
/// (mean of review scores, null while the title has no reviews).
#[derive(Debug, Serialize, Clone)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub description: Option<String>,
    pub genre: Vec<Genre>,
    pub category: Option<Category>,
    pub rating: Option<f64>,
}

#[derive(Debug)]
struct TitleRow {
    id: i64,
    name: String,
    year: i64,
    description: Option<String>,
    category: Option<Category>,
    rating: Option<f64>,
}

impl sqlx::FromRow<'_, ChosenRow> for TitleRow {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let category = match row.try_get::<Option<i64>, _>("category_id")? {
            Some(id) => Some(Category {
                id,
                name: row.try_get("category_name")?,
                slug: row.try_get("category_slug")?,
            }),
            None => None,
        };
        Ok(TitleRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            year: row.try_get("year")?,
            description: row.try_get("description")?,
            category,
            rating: row.try_get("rating")?,
        })
    }
}

const TITLE_SELECT: &str = "SELECT t.id, t.name, t.year, t.description, \
    c.id AS category_id, c.name AS category_name, c.slug AS category_slug, \
    (SELECT AVG(r.score) FROM review r WHERE r.title_id = t.id) AS rating \
    FROM title t LEFT JOIN category c ON t.category_id = c.id";

pub type TitleRepository = TitleRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct TitleRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> TitleRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateTitle) -> Result<Title> {
        let category_id = match &payload.category {
            Some(slug) => Some(self.category_id_by_slug(slug).await?),
            None => None,
        };
        let genre_ids = self.genre_ids_by_slugs(&payload.genre).await?;

        let result = sqlx::query(
            "INSERT INTO title (name, year, description, category_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&payload.name)
        .bind(payload.year)
        .bind(&payload.description)
        .bind(category_id)
        .execute(&self.executor)
        .await?;
        let id = result.last_insert_rowid();

        self.link_genres(id, &genre_ids).await?;
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Title> {
        let row = sqlx::query_as::<_, TitleRow>(&format!("{TITLE_SELECT} WHERE t.id = ?"))
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Title".to_string()))?;
        let genres = self.genres_of(id).await?;
        Ok(assemble(row, genres))
    }

    pub async fn exists(&self, id: i64) -> Result<()> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM title WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .map(|_| ())
            .ok_or_else(|| Error::RecordNotFound("Title".to_string()))
    }

    pub async fn list(&self, filter: TitleFilter, params: ListingParams) -> Result<Batch<Title>> {
        let ordering = params.ordering(&["name", "year"])?;
        // The select joins category, so order columns must stay qualified.
        let ordering = if ordering.is_empty() {
            "t.name DESC, t.id".to_string()
        } else {
            ordering
                .split(", ")
                .map(|term| format!("t.{term}"))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM title t ");
        push_filter(&mut count_query, &filter);
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.executor).await?;

        let mut query = QueryBuilder::new(TITLE_SELECT);
        query.push(" ");
        push_filter(&mut query, &filter);
        query.push(format!(" ORDER BY {ordering} LIMIT "));
        query.push_bind(params.limit);
        query.push(" OFFSET ");
        query.push_bind(params.offset);
        let title_rows = query
            .build_query_as::<TitleRow>()
            .fetch_all(&self.executor)
            .await?;

        let mut rows = Vec::with_capacity(title_rows.len());
        for row in title_rows {
            let genres = self.genres_of(row.id).await?;
            rows.push(assemble(row, genres));
        }

        Ok(Batch {
            offset: params.offset,
            total: total as u64,
            rows,
        })
    }

    pub async fn update(&self, id: i64, payload: UpdateTitle) -> Result<Title> {
        let current = self.get(id).await?;

        let name = payload.name.unwrap_or(current.name);
        let year = payload.year.unwrap_or(current.year);
        let description = payload.description.unwrap_or(current.description);
        let category_id = match payload.category {
            None => current.category.map(|c| c.id),
            Some(None) => None,
            Some(Some(slug)) => Some(self.category_id_by_slug(&slug).await?),
        };

        sqlx::query("UPDATE title SET name = ?, year = ?, description = ?, category_id = ? WHERE id = ?")
            .bind(&name)
            .bind(year)
            .bind(&description)
            .bind(category_id)
            .bind(id)
            .execute(&self.executor)
            .await?;

        if let Some(slugs) = &payload.genre {
            let genre_ids = self.genre_ids_by_slugs(slugs).await?;
            sqlx::query("DELETE FROM title_genres WHERE title_id = ?")
                .bind(id)
                .execute(&self.executor)
                .await?;
            self.link_genres(id, &genre_ids).await?;
        }

        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.exists(id).await?;
        sqlx::query("DELETE FROM title WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        Ok(())
    }

    async fn genres_of(&self, title_id: i64) -> Result<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT g.id, g.name, g.slug FROM genre g \
             JOIN title_genres tg ON tg.genre_id = g.id \
             WHERE tg.title_id = ? ORDER BY g.name",
        )
        .bind(title_id)
        .fetch_all(&self.executor)
        .await?;
        Ok(genres)
    }

    async fn category_id_by_slug(&self, slug: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM category WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Category".to_string()))
    }

    async fn genre_ids_by_slugs(&self, slugs: &[String]) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let id = sqlx::query_scalar::<_, i64>("SELECT id FROM genre WHERE slug = ?")
                .bind(slug)
                .fetch_optional(&self.executor)
                .await?
                .ok_or_else(|| Error::RecordNotFound("Genre".to_string()))?;
            ids.push(id);
        }
        Ok(ids)
    }

    async fn link_genres(&self, title_id: i64, genre_ids: &[i64]) -> Result<()> {
        for genre_id in genre_ids {
            sqlx::query("INSERT OR IGNORE INTO title_genres (title_id, genre_id) VALUES (?, ?)")
                .bind(title_id)
                .bind(genre_id)
                .execute(&self.executor)
                .await?;
        }
        Ok(())
    }
}

fn assemble(row: TitleRow, genres: Vec<Genre>) -> Title {
    Title {
        id: row.id,
        name: row.name,
        year: row.year,
        description: row.description,
        genre: genres,
        category: row.category,
        rating: row.rating,
    }
}

fn push_filter(query: &mut QueryBuilder<'_, crate::ChosenDB>, filter: &TitleFilter) {
    if filter.is_empty() {
        return;
    }
    let mut first = true;
    let mut separator = |query: &mut QueryBuilder<'_, crate::ChosenDB>| {
        query.push(if std::mem::take(&mut first) {
            " WHERE "
        } else {
            " AND "
        });
    };
    if let Some(category) = &filter.category {
        separator(query);
        query.push("t.category_id IN (SELECT id FROM category WHERE slug = ");
        query.push_bind(category.clone());
        query.push(")");
    }
    if let Some(genre) = &filter.genre {
        separator(query);
        query.push(
            "t.id IN (SELECT tg.title_id FROM title_genres tg \
             JOIN genre g ON g.id = tg.genre_id WHERE g.slug = ",
        );
        query.push_bind(genre.clone());
        query.push(")");
    }
    if let Some(name) = &filter.name {
        separator(query);
        query.push("t.name LIKE ");
        query.push_bind(format!("%{}%", like_escape(name)));
        query.push(" ESCAPE '\\'");
    }
    if let Some(year) = filter.year {
        separator(query);
        query.push("t.year = ");
        query.push_bind(year);
    }
}
