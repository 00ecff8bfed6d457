use crate::api::catalog::CatalogEntry;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::price;
use crate::queries::recipes::{self, RecipeFilter, RecipeRow};
use axum::{
    extract::{Query, State},
    Json,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRecipesParams {
    /// Comma separated tag IDs to filter by
    pub tags: Option<String>,
    /// Comma separated ingredient IDs to filter by
    pub ingredients: Option<String>,
}

impl ListRecipesParams {
    pub fn filter(&self) -> Result<RecipeFilter, ApiError> {
        Ok(RecipeFilter {
            tag_ids: parse_id_list("tags", self.tags.as_deref())?,
            ingredient_ids: parse_id_list("ingredients", self.ingredients.as_deref())?,
        })
    }
}

/// Parse `"1,2,3"` into ids. Empty segments are skipped.
pub fn parse_id_list(param: &str, raw: Option<&str>) -> Result<Vec<i64>, ApiError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment.parse::<i64>().map_err(|_| {
                ApiError::field(param, format!("\"{segment}\" is not a valid integer id."))
            })
        })
        .collect()
}

/// Recipe as it appears in lists.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    #[serde(serialize_with = "price::serialize")]
    #[schema(value_type = String, example = "5.50")]
    pub price: BigDecimal,
    pub link: Option<String>,
    pub tags: Vec<CatalogEntry>,
    pub ingredients: Vec<CatalogEntry>,
}

impl From<RecipeRow> for RecipeSummary {
    fn from(row: RecipeRow) -> Self {
        Self {
            id: row.recipe.id,
            title: row.recipe.title,
            time_minutes: row.recipe.time_minutes,
            price: row.recipe.price,
            link: row.recipe.link,
            tags: row.tags.into_iter().map(CatalogEntry::from).collect(),
            ingredients: row.ingredients.into_iter().map(CatalogEntry::from).collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "Your recipes, newest first", body = Vec<RecipeSummary>),
        (status = 400, description = "Malformed id list", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListRecipesParams>,
) -> Result<Json<Vec<RecipeSummary>>, ApiError> {
    let filter = params.filter()?;

    let mut conn = pool.get()?;
    let found = recipes::list(&mut conn, user.id, &filter)?;
    let rows = recipes::with_relations(&mut conn, found)?;

    Ok(Json(rows.into_iter().map(RecipeSummary::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("tags", None).unwrap(), Vec::<i64>::new());
        assert_eq!(parse_id_list("tags", Some("")).unwrap(), Vec::<i64>::new());
        assert_eq!(parse_id_list("tags", Some("1,2, 3")).unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list("tags", Some("4,,5,")).unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_parse_id_list_rejects_garbage() {
        let ApiError::Validation { fields, .. } =
            parse_id_list("ingredients", Some("1,abc")).unwrap_err()
        else {
            panic!("expected a validation error");
        };
        assert!(fields.contains_key("ingredients"));
    }

    #[test]
    fn test_params_build_filter() {
        let params = ListRecipesParams {
            tags: Some("7".to_string()),
            ingredients: None,
        };
        assert_eq!(
            params.filter().unwrap(),
            RecipeFilter {
                tag_ids: vec![7],
                ingredient_ids: vec![],
            }
        );
    }
}
