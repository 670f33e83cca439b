use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("could not determine a data directory for the database")]
    NoDataDir,
}

pub type Result<T> = std::result::Result<T, StoreError>;
