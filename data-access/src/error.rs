/// Errors surfaced to callers of [`DataAccess`](crate::DataAccess).
///
/// Cache failures never show up here; they are logged and the store of record
/// is used instead.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("store of record unavailable :: {0}")]
    StoreUnavailable(sqlx::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound,
            err => Error::StoreUnavailable(err),
        }
    }
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}
