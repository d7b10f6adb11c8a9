use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum HotelError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("database error: {0}")]
    Database(#[source] DatabaseError),
}

impl From<DatabaseError> for HotelError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(message) => HotelError::Conflict(message),
            other => HotelError::Database(other),
        }
    }
}
