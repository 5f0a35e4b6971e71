use sea_orm::{DbErr, SqlErr};

use forum_core::error::RepoError;

/// Translate a SeaORM error into the repository taxonomy.
///
/// Unique violations and Postgres serialization failures (SQLSTATE 40001,
/// deadlocks) become [`RepoError::Conflict`] so callers can retry them.
pub(crate) fn map_db_err(err: DbErr) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => return RepoError::Conflict(msg),
        Some(SqlErr::ForeignKeyConstraintViolation(msg)) => return RepoError::Constraint(msg),
        _ => {}
    }

    match err {
        DbErr::Conn(e) => RepoError::Connection(e.to_string()),
        DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
        other => {
            let msg = other.to_string();
            if is_serialization_failure(&msg) {
                RepoError::Conflict(msg)
            } else {
                RepoError::Query(msg)
            }
        }
    }
}

fn is_serialization_failure(msg: &str) -> bool {
    msg.contains("40001")
        || msg.contains("40P01")
        || msg.contains("could not serialize access")
        || msg.contains("deadlock detected")
}
