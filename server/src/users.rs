//! Account registration and credential checks.

use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::auth::{hash_password, verify_password};
use crate::error::ApiError;
use crate::models::{NewUser, User};
use crate::schema::users;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Users must have an email address.")]
    EmptyEmail,

    #[error("Ensure this field has at least {MIN_PASSWORD_LENGTH} characters.")]
    PasswordTooShort,

    #[error("User with this email already exists.")]
    DuplicateEmail,

    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error(transparent)]
    Database(#[from] DieselError),
}

impl From<AccountError> for ApiError {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::EmptyEmail | AccountError::DuplicateEmail => {
                ApiError::field("email", error.to_string())
            }
            AccountError::PasswordTooShort => ApiError::field("password", error.to_string()),
            AccountError::Hash(_) => ApiError::Internal(error.to_string()),
            AccountError::Database(e) => ApiError::from(e),
        }
    }
}

/// Lowercase the domain part of an email, keeping the local part as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn check_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AccountError::PasswordTooShort);
    }
    Ok(())
}

/// Validate registration input and return the normalized email.
pub fn check_new_account(email: &str, password: &str) -> Result<String, AccountError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AccountError::EmptyEmail);
    }
    check_password(password)?;
    Ok(email)
}

pub fn create_user(
    conn: &mut PgConnection,
    email: &str,
    password: &str,
    name: &str,
) -> Result<User, AccountError> {
    insert_account(conn, email, password, name, false)
}

pub fn create_superuser(
    conn: &mut PgConnection,
    email: &str,
    password: &str,
    name: &str,
) -> Result<User, AccountError> {
    insert_account(conn, email, password, name, true)
}

fn insert_account(
    conn: &mut PgConnection,
    email: &str,
    password: &str,
    name: &str,
    admin: bool,
) -> Result<User, AccountError> {
    let email = check_new_account(email, password)?;
    let password_hash = hash_password(password).map_err(|e| AccountError::Hash(e.to_string()))?;

    let new_user = NewUser {
        email: &email,
        name: name.trim(),
        password_hash: &password_hash,
        is_staff: admin,
        is_superuser: admin,
    };

    match diesel::insert_into(users::table)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result(conn)
    {
        Ok(user) => {
            tracing::info!(user_id = user.id, admin, "created user");
            Ok(user)
        }
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            Err(AccountError::DuplicateEmail)
        }
        Err(e) => Err(e.into()),
    }
}

/// Look up an active user by email and check the password.
pub fn authenticate(
    conn: &mut PgConnection,
    email: &str,
    password: &str,
) -> QueryResult<Option<User>> {
    let user = users::table
        .filter(users::email.eq(normalize_email(email)))
        .filter(users::is_active.eq(true))
        .select(User::as_select())
        .first(conn)
        .optional()?;

    Ok(user.filter(|user| verify_password(password, &user.password_hash)))
}

/// Update the caller's own name and/or password.
pub fn update_profile(
    conn: &mut PgConnection,
    user_id: i64,
    name: Option<&str>,
    password: Option<&str>,
) -> Result<User, AccountError> {
    let password_hash = match password {
        Some(password) => {
            check_password(password)?;
            Some(hash_password(password).map_err(|e| AccountError::Hash(e.to_string()))?)
        }
        None => None,
    };

    let user = diesel::update(users::table.find(user_id))
        .set((
            name.map(|name| users::name.eq(name.trim())),
            password_hash.map(|hash| users::password_hash.eq(hash)),
            users::updated_at.eq(Utc::now()),
        ))
        .returning(User::as_returning())
        .get_result(conn)?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_email_normalized() {
        let sample_emails = [
            ("test1@EXAMPLE.com", "test1@example.com"),
            ("Test2@Example.com", "Test2@example.com"),
            ("TEST3@EXAMPLE.COM", "TEST3@example.com"),
            ("test4@example.COM", "test4@example.com"),
        ];
        for (email, expected) in sample_emails {
            assert_eq!(normalize_email(email), expected);
        }
    }

    #[test]
    fn test_normalize_uses_last_at_sign() {
        assert_eq!(normalize_email("\"a@b\"@EXAMPLE.com"), "\"a@b\"@example.com");
        assert_eq!(normalize_email("  user@Example.ORG "), "user@example.org");
    }

    #[test]
    fn test_new_user_without_email_fails() {
        assert!(matches!(
            check_new_account("", "password123"),
            Err(AccountError::EmptyEmail)
        ));
        assert!(matches!(
            check_new_account("   ", "password123"),
            Err(AccountError::EmptyEmail)
        ));
    }

    #[test]
    fn test_new_user_with_too_short_password_fails() {
        assert!(matches!(
            check_new_account("testUser5@example.com", "test1"),
            Err(AccountError::PasswordTooShort)
        ));
    }

    #[test]
    fn test_new_user_with_6_chars_password_succeeds() {
        assert_eq!(
            check_new_account("testUser6@EXAMPLE.com", "test12").unwrap(),
            "testUser6@example.com"
        );
    }

    #[test]
    fn test_account_errors_map_to_fields() {
        let ApiError::Validation { fields, .. } = ApiError::from(AccountError::PasswordTooShort)
        else {
            panic!("expected a validation error");
        };
        assert!(fields.contains_key("password"));

        let ApiError::Validation { fields, .. } = ApiError::from(AccountError::DuplicateEmail)
        else {
            panic!("expected a validation error");
        };
        assert!(fields.contains_key("email"));
    }
}
