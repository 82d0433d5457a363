//! Shared persistent-store plumbing.

use sqlx::postgres::PgQueryResult;

use crate::error::{Result, ServerError};

/// Collapse a fetch result into exactly one row.
///
/// Zero rows is a plain [`ServerError::NotFound`]; more than one row means
/// the storage broke a uniqueness invariant and is unrecoverable.
pub(crate) fn one_row<T>(mut rows: Vec<T>) -> Result<T> {
    match rows.len() {
        0 => Err(ServerError::NotFound),
        1 => Ok(rows.remove(0)),
        _ => Err(ServerError::Conflict),
    }
}

/// Surface a conditional write that touched no rows as NotFound.
pub(crate) fn ensure_affected(result: PgQueryResult) -> Result<()> {
    if result.rows_affected() == 0 {
        return Err(ServerError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_row() {
        assert!(matches!(
            one_row(Vec::<u8>::new()).unwrap_err(),
            ServerError::NotFound
        ));
        assert_eq!(one_row(vec![7u8]).unwrap(), 7);
        assert!(matches!(
            one_row(vec![1u8, 2]).unwrap_err(),
            ServerError::Conflict
        ));
    }
}
