pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Token error: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),
}
