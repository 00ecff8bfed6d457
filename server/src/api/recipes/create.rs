use crate::api::catalog::{names, validate_name, NameInput};
use crate::api::extract::ValidJson;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::media::MediaStore;
use crate::models::{NewRecipe, RecipeChanges};
use crate::price;
use crate::queries::recipes::{self, Relations};
use axum::{extract::State, http::StatusCode, Json};
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::Connection;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::get::RecipeDetail;

const MAX_LINK_LENGTH: usize = 255;

/// Body of POST and PUT. Any `user` field is ignored; the owner is always
/// the caller.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateRecipeRequest {
    #[validate(custom(function = "validate_name"))]
    pub title: String,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub time_minutes: i32,
    #[serde(deserialize_with = "price::deserialize")]
    #[schema(value_type = String, example = "5.50")]
    #[validate(custom(function = "price::validate"))]
    pub price: BigDecimal,
    pub description: Option<String>,
    #[validate(custom(function = "validate_link"))]
    pub link: Option<String>,
    /// Replaces the recipe's tags; each name is created if you don't have it yet
    #[validate(nested)]
    pub tags: Option<Vec<NameInput>>,
    /// Replaces the recipe's ingredients; each name is created if you don't have it yet
    #[validate(nested)]
    pub ingredients: Option<Vec<NameInput>>,
}

impl CreateRecipeRequest {
    pub fn new_recipe(&self, user_id: i64) -> NewRecipe<'_> {
        NewRecipe {
            user_id,
            title: self.title.trim(),
            time_minutes: self.time_minutes,
            price: self.price.clone(),
            description: self.description.as_deref().and_then(non_blank),
            link: self.link.as_deref().and_then(non_blank),
        }
    }

    /// Column updates for a full replacement. Optional fields that were
    /// left out stay as they are.
    pub fn changes(&self) -> RecipeChanges<'_> {
        RecipeChanges {
            title: Some(self.title.trim()),
            time_minutes: Some(self.time_minutes),
            price: Some(self.price.clone()),
            description: self.description.as_deref().map(non_blank),
            link: self.link.as_deref().map(non_blank),
            updated_at: Utc::now(),
        }
    }
}

/// Empty strings clear optional text columns.
pub fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

pub fn validate_link(link: &str) -> Result<(), ValidationError> {
    let link = link.trim();
    if link.is_empty() {
        return Ok(());
    }
    if link.chars().count() > MAX_LINK_LENGTH {
        return Err(ValidationError::new("max_length").with_message(Cow::Borrowed(
            "Ensure this field has no more than 255 characters.",
        )));
    }
    url::Url::parse(link)
        .map(|_| ())
        .map_err(|_| ValidationError::new("url").with_message(Cow::Borrowed("Enter a valid URL.")))
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created successfully", body = RecipeDetail),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    State(media): State<Arc<MediaStore>>,
    ValidJson(request): ValidJson<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeDetail>), ApiError> {
    let tags = request.tags.as_deref().map(names);
    let ingredients = request.ingredients.as_deref().map(names);
    let relations = Relations {
        tags: tags.as_deref(),
        ingredients: ingredients.as_deref(),
    };

    let mut conn = pool.get()?;
    let row = conn.transaction::<_, ApiError, _>(|conn| {
        let recipe = recipes::insert(conn, &request.new_recipe(user.id))?;
        recipes::attach(conn, user.id, recipe.id, relations)?;
        Ok(recipes::load_row(conn, recipe)?)
    })?;

    tracing::info!(recipe_id = row.recipe.id, "created recipe");
    Ok((StatusCode::CREATED, Json(RecipeDetail::new(row, &media))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn request(body: serde_json::Value) -> CreateRecipeRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_minimal_payload_is_valid() {
        let request = request(serde_json::json!({
            "title": "Sample recipe",
            "time_minutes": 22,
            "price": "5.25",
        }));
        assert!(request.validate().is_ok());
        assert_eq!(request.price, BigDecimal::from_str("5.25").unwrap());
        assert!(request.tags.is_none());
    }

    #[test]
    fn test_user_field_is_ignored() {
        let request = request(serde_json::json!({
            "title": "Sample recipe",
            "time_minutes": 5,
            "price": 5.5,
            "user": 42,
        }));
        assert_eq!(request.new_recipe(7).user_id, 7);
    }

    #[test]
    fn test_invalid_fields_are_reported() {
        let request = request(serde_json::json!({
            "title": "  ",
            "time_minutes": -1,
            "price": "1.234",
            "link": "not a url",
            "tags": [{"name": "ok"}, {"name": ""}],
        }));
        let crate::error::ApiError::Validation { fields, .. } =
            crate::error::ApiError::from(request.validate().unwrap_err())
        else {
            panic!("expected a validation error");
        };
        for key in ["title", "time_minutes", "price", "link", "tags[1].name"] {
            assert!(fields.contains_key(key), "missing {key} in {fields:?}");
        }
    }

    #[test]
    fn test_blank_optional_text_is_cleared() {
        let request = request(serde_json::json!({
            "title": "Sample recipe",
            "time_minutes": 5,
            "price": "1.00",
            "description": "",
            "link": "",
        }));
        let new_recipe = request.new_recipe(1);
        assert_eq!(new_recipe.description, None);
        assert_eq!(new_recipe.link, None);

        let changes = request.changes();
        assert_eq!(changes.description, Some(None));
        assert_eq!(changes.link, Some(None));
    }

    #[test]
    fn test_validate_link() {
        assert!(validate_link("https://example.com/recipe.pdf").is_ok());
        assert!(validate_link("").is_ok());
        assert!(validate_link("example").is_err());
        let long = format!("https://example.com/{}", "a".repeat(255));
        assert!(validate_link(&long).is_err());
    }
}
