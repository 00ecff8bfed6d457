//! Error type shared by every handler and its mapping onto HTTP responses.

use std::collections::BTreeMap;

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::r2d2;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::api::ErrorResponse;

/// Validation messages keyed by field path (`title`, `tags[0].name`, ...).
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Absent or owned by someone else; the two are never distinguished.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("database error: {0}")]
    Database(#[source] diesel::result::Error),

    #[error("database connection failed: {0}")]
    Pool(#[from] r2d2::PoolError),

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// A validation failure attached to one field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        Self::Validation {
            message: "Invalid input".to_string(),
            fields,
        }
    }

    /// A validation failure that is not tied to a field.
    pub fn invalid(message: impl Into<String>) -> Self {
        let message = message.into();
        let mut fields = FieldErrors::new();
        fields.insert(NON_FIELD_ERRORS.to_string(), vec![message.clone()]);
        Self::Validation { message, fields }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Pool(_) | Self::Io { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => Self::NotFound("Resource"),
            other => Self::Database(other),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        collect_field_errors("", &errors, &mut fields);
        Self::Validation {
            message: "Invalid input".to_string(),
            fields,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::field("image", "File too large")
        } else {
            Self::invalid(format!("Failed to read multipart data: {}", error.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            Self::Validation { message, fields } => ErrorResponse {
                error: message,
                fields: Some(fields),
            },
            Self::Database(_) | Self::Pool(_) | Self::Io { .. } | Self::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    fields: None,
                }
            }
            other => ErrorResponse {
                error: other.to_string(),
                fields: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

fn collect_field_errors(prefix: &str, errors: &ValidationErrors, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(issues) => out
                .entry(path)
                .or_default()
                .extend(issues.iter().map(describe)),
            ValidationErrorsKind::Struct(inner) => collect_field_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

fn describe(issue: &ValidationError) -> String {
    match &issue.message {
        Some(message) => message.to_string(),
        None => issue.code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Child {
        #[validate(length(min = 1, message = "This field may not be blank."))]
        name: String,
    }

    #[derive(Validate)]
    struct Parent {
        #[validate(range(min = 0))]
        count: i32,
        #[validate(nested)]
        children: Vec<Child>,
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Unauthorized("Missing Authorization header").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::NotFound("Recipe").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::field("image", "bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(diesel::result::Error::RollbackTransaction).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_diesel_not_found_maps_to_not_found() {
        let error = ApiError::from(diesel::result::Error::NotFound);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_nested_validation_errors_are_flattened() {
        let parent = Parent {
            count: -1,
            children: vec![
                Child {
                    name: "ok".to_string(),
                },
                Child {
                    name: String::new(),
                },
            ],
        };

        let ApiError::Validation { fields, .. } = ApiError::from(parent.validate().unwrap_err())
        else {
            panic!("expected a validation error");
        };

        assert_eq!(fields["count"], vec!["range".to_string()]);
        assert_eq!(
            fields["children[1].name"],
            vec!["This field may not be blank.".to_string()]
        );
        assert!(!fields.contains_key("children[0].name"));
    }

    #[test]
    fn test_field_error_has_single_entry() {
        let ApiError::Validation { fields, .. } = ApiError::field("image", "Upload a valid image.")
        else {
            panic!("expected a validation error");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["image"], vec!["Upload a valid image.".to_string()]);
    }
}
