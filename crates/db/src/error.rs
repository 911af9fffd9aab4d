//! Translation of database failures into storage errors.

use sea_orm::{DbErr, SqlErr};
use tally_core::store::StoreError;

/// Maps a `DbErr` into the storage error the engines understand.
///
/// Unique violations carry the constraint name so callers can tell a
/// duplicate document from a duplicate reversal.
pub(crate) fn store_error(err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(message)) = err.sql_err() {
        let constraint = constraint_name(&message).map_or(message.clone(), str::to_string);
        return StoreError::UniqueViolation { constraint };
    }
    match err {
        DbErr::RecordNotFound(what) => StoreError::NotFound(what),
        DbErr::RecordNotUpdated => StoreError::NotFound("row to update".to_string()),
        other => {
            let message = other.to_string();
            if is_serialization_failure(&message) {
                StoreError::SerializationConflict(message)
            } else {
                StoreError::Backend(message)
            }
        }
    }
}

/// Extracts the quoted constraint name from a Postgres violation message.
fn constraint_name(message: &str) -> Option<&str> {
    let start = message.find('"')? + 1;
    let len = message[start..].find('"')?;
    Some(&message[start..start + len])
}

/// SQLSTATE 40001 and 40P01 abort the whole transaction; retrying it may succeed.
fn is_serialization_failure(message: &str) -> bool {
    message.contains("could not serialize")
        || message.contains("40001")
        || message.contains("deadlock detected")
        || message.contains("40P01")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_name_extraction() {
        let message = r#"duplicate key value violates unique constraint "uq_transactions_document_reference""#;
        assert_eq!(constraint_name(message), Some("uq_transactions_document_reference"));
        assert_eq!(constraint_name("no quotes here"), None);
    }

    #[test]
    fn test_serialization_failure_detection() {
        assert!(is_serialization_failure(
            "could not serialize access due to concurrent update"
        ));
        assert!(is_serialization_failure("deadlock detected"));
        assert!(!is_serialization_failure("relation \"accounts\" does not exist"));
    }

    #[test]
    fn test_not_found_mapping() {
        assert_eq!(
            store_error(DbErr::RecordNotFound("transaction".to_string())),
            StoreError::NotFound("transaction".to_string())
        );
        assert!(matches!(
            store_error(DbErr::Custom("boom".to_string())),
            StoreError::Backend(_)
        ));
    }
}
