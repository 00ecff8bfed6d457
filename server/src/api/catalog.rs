//! Tag and ingredient endpoints, plus the request and response types they
//! share with the nested entries of a recipe payload. Both resources have
//! the same shape, so the handler set is generated once per resource.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::error::ApiError;
use crate::models::{Ingredient, Tag};
use crate::queries::is_unique_violation;

pub const MAX_NAME_LENGTH: usize = 255;

/// `{name}` as accepted on create, rename and inside recipe payloads.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct NameInput {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
}

impl NameInput {
    pub fn trimmed(&self) -> &str {
        self.name.trim()
    }
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::new("blank")
            .with_message(Cow::Borrowed("This field may not be blank.")));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::new("max_length").with_message(Cow::Borrowed(
            "Ensure this field has no more than 255 characters.",
        )));
    }
    Ok(())
}

/// Trimmed names of a nested list, in input order.
pub fn names(entries: &[NameInput]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.trimmed().to_string())
        .collect()
}

/// A tag or ingredient as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
}

impl From<Tag> for CatalogEntry {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

impl From<Ingredient> for CatalogEntry {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssignedOnlyParams {
    /// Only return entries attached to at least one of your recipes
    /// (`1`, `true`, `yes` or `on`).
    pub assigned_only: Option<String>,
}

impl AssignedOnlyParams {
    pub fn enabled(&self) -> bool {
        self.assigned_only.as_deref().is_some_and(is_truthy)
    }
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Turn a unique violation on `(user_id, name)` into a field error.
pub fn name_error(error: diesel::result::Error, resource: &str) -> ApiError {
    if is_unique_violation(&error) {
        ApiError::field("name", format!("{resource} with this name already exists."))
    } else {
        error.into()
    }
}

macro_rules! catalog_endpoints {
    (
        $module:ident,
        resource = $resource:literal,
        tag = $tag:tt,
        collection = $collection:tt,
        item = $item:tt,
        handlers = ($list:ident, $create:ident, $get:ident, $update:ident, $delete:ident $(,)?) $(,)?
    ) => {
        pub mod $module {
            use axum::extract::{Path, Query, State};
            use axum::http::StatusCode;
            use axum::routing::get;
            use axum::{Json, Router};
            use std::sync::Arc;
            use utoipa::OpenApi;

            use super::{name_error, AssignedOnlyParams, CatalogEntry, NameInput};
            use crate::api::extract::ValidJson;
            use crate::api::ErrorResponse;
            use crate::auth::AuthUser;
            use crate::db::DbPool;
            use crate::error::ApiError;
            use crate::queries::$module as queries;
            use crate::AppState;

            pub fn router() -> Router<AppState> {
                Router::new()
                    .route("/", get($list).post($create))
                    .route(
                        "/{id}",
                        get($get)
                            .put($update)
                            .patch($update)
                            .delete($delete),
                    )
            }

            #[derive(OpenApi)]
            #[openapi(
                paths($list, $create, $get, $update, $delete),
                components(schemas(CatalogEntry))
            )]
            pub struct ApiDoc;

            #[utoipa::path(
                get,
                path = $collection,
                tag = $tag,
                params(AssignedOnlyParams),
                responses(
                    (status = 200, description = "Your entries, by descending name", body = Vec<CatalogEntry>),
                    (status = 401, description = "Unauthorized", body = ErrorResponse)
                ),
                security(
                    ("bearer_auth" = [])
                )
            )]
            pub async fn $list(
                AuthUser(user): AuthUser,
                State(pool): State<Arc<DbPool>>,
                Query(params): Query<AssignedOnlyParams>,
            ) -> Result<Json<Vec<CatalogEntry>>, ApiError> {
                let mut conn = pool.get()?;
                let entries = queries::list(&mut conn, user.id, params.enabled())?;
                Ok(Json(entries.into_iter().map(CatalogEntry::from).collect()))
            }

            #[utoipa::path(
                post,
                path = $collection,
                tag = $tag,
                request_body = NameInput,
                responses(
                    (status = 201, description = "Created", body = CatalogEntry),
                    (status = 400, description = "Blank or already used name", body = ErrorResponse),
                    (status = 401, description = "Unauthorized", body = ErrorResponse)
                ),
                security(
                    ("bearer_auth" = [])
                )
            )]
            pub async fn $create(
                AuthUser(user): AuthUser,
                State(pool): State<Arc<DbPool>>,
                ValidJson(request): ValidJson<NameInput>,
            ) -> Result<(StatusCode, Json<CatalogEntry>), ApiError> {
                let mut conn = pool.get()?;
                let entry = queries::create(&mut conn, user.id, request.trimmed())
                    .map_err(|e| name_error(e, $resource))?;

                tracing::debug!(id = entry.id, resource = $resource, "created catalog entry");
                Ok((StatusCode::CREATED, Json(entry.into())))
            }

            #[utoipa::path(
                get,
                path = $item,
                tag = $tag,
                params(
                    ("id" = i64, Path, description = "Entry ID")
                ),
                responses(
                    (status = 200, description = "The entry", body = CatalogEntry),
                    (status = 404, description = "Not found", body = ErrorResponse),
                    (status = 401, description = "Unauthorized", body = ErrorResponse)
                ),
                security(
                    ("bearer_auth" = [])
                )
            )]
            pub async fn $get(
                AuthUser(user): AuthUser,
                State(pool): State<Arc<DbPool>>,
                Path(id): Path<i64>,
            ) -> Result<Json<CatalogEntry>, ApiError> {
                let mut conn = pool.get()?;
                let entry = queries::find(&mut conn, user.id, id)?
                    .ok_or(ApiError::NotFound($resource))?;
                Ok(Json(entry.into()))
            }

            /// Rename in place. Mounted for both PUT and PATCH since `name`
            /// is the only field.
            #[utoipa::path(
                patch,
                path = $item,
                tag = $tag,
                params(
                    ("id" = i64, Path, description = "Entry ID")
                ),
                request_body = NameInput,
                responses(
                    (status = 200, description = "Renamed", body = CatalogEntry),
                    (status = 400, description = "Blank or already used name", body = ErrorResponse),
                    (status = 404, description = "Not found", body = ErrorResponse),
                    (status = 401, description = "Unauthorized", body = ErrorResponse)
                ),
                security(
                    ("bearer_auth" = [])
                )
            )]
            pub async fn $update(
                AuthUser(user): AuthUser,
                State(pool): State<Arc<DbPool>>,
                Path(id): Path<i64>,
                ValidJson(request): ValidJson<NameInput>,
            ) -> Result<Json<CatalogEntry>, ApiError> {
                let mut conn = pool.get()?;
                let entry = queries::rename(&mut conn, user.id, id, request.trimmed())
                    .map_err(|e| name_error(e, $resource))?
                    .ok_or(ApiError::NotFound($resource))?;
                Ok(Json(entry.into()))
            }

            #[utoipa::path(
                delete,
                path = $item,
                tag = $tag,
                params(
                    ("id" = i64, Path, description = "Entry ID")
                ),
                responses(
                    (status = 204, description = "Deleted; recipes keep existing without it"),
                    (status = 404, description = "Not found", body = ErrorResponse),
                    (status = 401, description = "Unauthorized", body = ErrorResponse)
                ),
                security(
                    ("bearer_auth" = [])
                )
            )]
            pub async fn $delete(
                AuthUser(user): AuthUser,
                State(pool): State<Arc<DbPool>>,
                Path(id): Path<i64>,
            ) -> Result<StatusCode, ApiError> {
                let mut conn = pool.get()?;
                if !queries::delete(&mut conn, user.id, id)? {
                    return Err(ApiError::NotFound($resource));
                }
                Ok(StatusCode::NO_CONTENT)
            }
        }
    };
}

catalog_endpoints!(
    tags,
    resource = "Tag",
    tag = "tags",
    collection = "/api/tags",
    item = "/api/tags/{id}",
    handlers = (list_tags, create_tag, get_tag, update_tag, delete_tag),
);

catalog_endpoints!(
    ingredients,
    resource = "Ingredient",
    tag = "ingredients",
    collection = "/api/ingredients",
    item = "/api/ingredients/{id}",
    handlers = (
        list_ingredients,
        create_ingredient,
        get_ingredient,
        update_ingredient,
        delete_ingredient,
    ),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_only_truthiness() {
        for value in ["1", "true", "TRUE", "Yes", "on"] {
            assert!(is_truthy(value), "{value} should be truthy");
        }
        for value in ["0", "false", "no", "", "2"] {
            assert!(!is_truthy(value), "{value} should not be truthy");
        }
        assert!(!AssignedOnlyParams::default().enabled());
    }

    #[test]
    fn test_name_validation() {
        assert!(NameInput { name: "Vegan".to_string() }.validate().is_ok());
        assert!(NameInput { name: "   ".to_string() }.validate().is_err());
        assert!(NameInput { name: "x".repeat(256) }.validate().is_err());
        assert!(NameInput { name: "x".repeat(255) }.validate().is_ok());
    }

    #[test]
    fn test_names_are_trimmed() {
        let entries = vec![
            NameInput { name: " Thai ".to_string() },
            NameInput { name: "Dinner".to_string() },
        ];
        assert_eq!(names(&entries), vec!["Thai", "Dinner"]);
    }

    #[test]
    fn test_generated_docs_keep_resources_apart() {
        use utoipa::OpenApi;

        let tag_paths = tags::ApiDoc::openapi().paths.paths;
        let ingredient_paths = ingredients::ApiDoc::openapi().paths.paths;
        assert!(tag_paths.contains_key("/api/tags/{id}"));
        assert!(!tag_paths.contains_key("/api/ingredients"));
        assert!(ingredient_paths.contains_key("/api/ingredients/{id}"));

        let operation_id = |paths: &utoipa::openapi::path::Paths, path: &str| {
            paths.paths[path].get.as_ref().and_then(|op| op.operation_id.clone())
        };
        assert_eq!(
            operation_id(&tags::ApiDoc::openapi().paths, "/api/tags").as_deref(),
            Some("list_tags")
        );
        assert_eq!(
            operation_id(&ingredients::ApiDoc::openapi().paths, "/api/ingredients").as_deref(),
            Some("list_ingredients")
        );
    }

    #[test]
    fn test_name_error_maps_other_errors_through() {
        let error = name_error(diesel::result::Error::NotFound, "Tag");
        assert_eq!(error.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
