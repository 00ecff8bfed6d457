//! Owner-scoped database queries. Every function takes the requesting
//! user's id and filters on it in SQL, so rows owned by someone else are
//! indistinguishable from missing ones.

mod catalog;
pub mod recipes;

pub use catalog::{ingredients, tags};

use diesel::result::{DatabaseErrorKind, Error};

pub fn is_unique_violation(error: &Error) -> bool {
    matches!(
        error,
        Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}
