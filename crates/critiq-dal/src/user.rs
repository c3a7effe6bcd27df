use critiq_types::{claim::Role, validate};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Pool;
use tracing::debug;

use crate::{Batch, Error, ListingParams, error::Result};

pub(crate) fn valid_username(username: &str, _ctx: &()) -> garde::Result {
    validate::check_username(username).map_err(|e| garde::Error::new(e.to_string()))
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateUser {
    #[garde(length(min = 1, max = 150), custom(valid_username))]
    pub username: String,
    #[garde(email, length(max = 254))]
    pub email: String,
    #[garde(inner(length(max = 150)))]
    pub first_name: Option<String>,
    #[garde(inner(length(max = 150)))]
    pub last_name: Option<String>,
    #[garde(inner(length(max = 5000)))]
    pub bio: Option<String>,
    #[garde(skip)]
    pub role: Option<Role>,
}

/// Partial update - absent fields keep their stored value, an explicit
/// null clears the nullable ones. Role changes apply only through the
/// admin path, `update_self` pins the stored role.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateUser {
    #[garde(inner(length(min = 1, max = 150), custom(valid_username)))]
    pub username: Option<String>,
    #[garde(inner(email, length(max = 254)))]
    pub email: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::double_option"
    )]
    #[garde(inner(inner(length(max = 150))))]
    pub first_name: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::double_option"
    )]
    #[garde(inner(inner(length(max = 150))))]
    pub last_name: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::double_option"
    )]
    #[garde(inner(inner(length(max = 5000))))]
    pub bio: Option<Option<String>>,
    #[garde(skip)]
    pub role: Option<Role>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserInt {
    id: i64,
    username: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    role: String,
    is_superuser: bool,
    confirmation_code: i64,
}

#[derive(Debug, Serialize, Clone)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
    #[serde(skip_serializing)]
    pub is_superuser: bool,
    #[serde(skip_serializing)]
    pub confirmation_code: i64,
}

impl From<UserInt> for User {
    fn from(value: UserInt) -> Self {
        Self {
            id: value.id,
            username: value.username,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            bio: value.bio,
            role: value.role.parse().unwrap_or_default(),
            is_superuser: value.is_superuser,
            confirmation_code: value.confirmation_code,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, bio, role, is_superuser, confirmation_code";

pub type UserRepository = UserRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateUser) -> Result<User> {
        let role = payload.role.unwrap_or_default();
        let result = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, bio, role) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&payload.username)
        .bind(&payload.email)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(&payload.bio)
        .bind(role.as_str())
        .execute(&self.executor)
        .await?;

        self.get(result.last_insert_rowid()).await
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        let user = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("User".to_string()))?;
        Ok(user.into())
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        let user = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("User".to_string()))?;
        Ok(user.into())
    }

    pub async fn list(&self, params: ListingParams) -> Result<Batch<User>> {
        let ordering = params.ordering(&["username", "email", "role"])?;
        let ordering = if ordering.is_empty() {
            "username DESC".to_string()
        } else {
            ordering
        };
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.executor)
            .await?;
        let rows = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY {ordering} LIMIT ? OFFSET ?"
        ))
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&self.executor)
        .await?
        .into_iter()
        .map(User::from)
        .collect();
        Ok(Batch {
            offset: params.offset,
            total: total as u64,
            rows,
        })
    }

    pub async fn update_by_username(&self, username: &str, payload: UpdateUser) -> Result<User> {
        let current = self.get_by_username(username).await?;
        self.apply_update(current, payload).await
    }

    /// Self service update: whatever role value the payload carries, the
    /// stored role survives.
    pub async fn update_self(&self, id: i64, mut payload: UpdateUser) -> Result<User> {
        let current = self.get(id).await?;
        payload.role = Some(current.role);
        self.apply_update(current, payload).await
    }

    async fn apply_update(&self, current: User, payload: UpdateUser) -> Result<User> {
        let username = payload.username.unwrap_or(current.username);
        let email = payload.email.unwrap_or(current.email);
        let first_name = payload.first_name.unwrap_or(current.first_name);
        let last_name = payload.last_name.unwrap_or(current.last_name);
        let bio = payload.bio.unwrap_or(current.bio);
        let role = payload.role.unwrap_or(current.role);
        sqlx::query(
            "UPDATE users SET username = ?, email = ?, first_name = ?, last_name = ?, \
             bio = ?, role = ? WHERE id = ?",
        )
        .bind(&username)
        .bind(&email)
        .bind(&first_name)
        .bind(&last_name)
        .bind(&bio)
        .bind(role.as_str())
        .bind(current.id)
        .execute(&self.executor)
        .await?;
        self.get(current.id).await
    }

    pub async fn delete_by_username(&self, username: &str) -> Result<()> {
        let existing = self.get_by_username(username).await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(existing.id)
            .execute(&self.executor)
            .await?;
        Ok(())
    }

    /// Signup is create-or-refresh: an exact (email, username) match gets
    /// a new confirmation code, otherwise a fresh user record is created.
    /// A collision on only one of the two surfaces as `AlreadyTaken`
    /// naming the clashing column.
    pub async fn signup(&self, email: &str, username: &str, code: i64) -> Result<User> {
        let existing = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? AND username = ?"
        ))
        .bind(email)
        .bind(username)
        .fetch_optional(&self.executor)
        .await?;

        if let Some(user) = existing {
            debug!("Refreshing confirmation code for user {}", user.id);
            sqlx::query("UPDATE users SET confirmation_code = ? WHERE id = ?")
                .bind(code)
                .bind(user.id)
                .execute(&self.executor)
                .await?;
            return self.get(user.id).await;
        }

        // Pre-check for a nicer error; the unique constraints still decide
        // under concurrency.
        for (field, value) in [("username", username), ("email", email)] {
            let sql = format!("SELECT COUNT(*) FROM users WHERE {field} = ?");
            let clash = sqlx::query_scalar::<_, i64>(&sql)
                .bind(value)
                .fetch_one(&self.executor)
                .await?;
            if clash > 0 {
                return Err(Error::AlreadyTaken { field });
            }
        }

        let result =
            sqlx::query("INSERT INTO users (username, email, confirmation_code) VALUES (?, ?, ?)")
                .bind(username)
                .bind(email)
                .bind(code)
                .execute(&self.executor)
                .await?;
        self.get(result.last_insert_rowid()).await
    }

    /// Token exchange lookup. A wrong code and an unknown username are
    /// indistinguishable on purpose.
    pub async fn find_by_code(&self, username: &str, code: i64) -> Result<User> {
        let user = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? AND confirmation_code = ?"
        ))
        .bind(username)
        .bind(code)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("User".to_string()))?;
        Ok(user.into())
    }
}
