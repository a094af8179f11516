use crate::application::repos::RepoError;

/// Classify driver errors into the store's error vocabulary.
///
/// `RowNotFound` maps to [`RepoError::TrackNotFound`]; callers that look up
/// something other than a single track re-map it themselves.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::TrackNotFound,
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("invalid input syntax") => {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("violates") => RepoError::Integrity {
            message: db.message().to_string(),
        },
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to statement timeout") =>
        {
            RepoError::Timeout
        }
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}
