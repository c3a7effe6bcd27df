pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Storage level uniqueness violation - the last line of defense
    /// when concurrent requests slip past pre-insert checks.
    #[error("Conflict on unique value: {0}")]
    Conflict(String),

    /// Review for this (title, author) pair already exists.
    #[error("Duplicate review for title {title_id} by user {author_id}")]
    DuplicateReview { title_id: i64, author_id: i64 },

    /// Unique value claimed by another record; `field` names the column
    /// so API callers can report it.
    #[error("Value for {field} is already taken")]
    AlreadyTaken { field: &'static str },

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        match &value {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::Conflict(db.message().to_string())
            }
            sqlx::Error::RowNotFound => Error::RecordNotFound("Record".to_string()),
            _ => Error::DatabaseError(value),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Error::DatabaseError(value.into())
    }
}
