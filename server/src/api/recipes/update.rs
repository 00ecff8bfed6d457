use crate::api::catalog::{names, validate_name, NameInput};
use crate::api::extract::ValidJson;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::media::MediaStore;
use crate::models::RecipeChanges;
use crate::price;
use crate::queries::recipes::{self, RecipeRow, Relations};
use axum::{
    extract::{Path, State},
    Json,
};
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use super::create::{non_blank, validate_link, CreateRecipeRequest};
use super::get::RecipeDetail;

/// Body of PATCH: every field is optional and only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateRecipeRequest {
    #[validate(custom(function = "validate_name"))]
    pub title: Option<String>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub time_minutes: Option<i32>,
    #[serde(default, deserialize_with = "price::option::deserialize")]
    #[schema(value_type = Option<String>, example = "5.50")]
    #[validate(custom(function = "price::validate"))]
    pub price: Option<BigDecimal>,
    pub description: Option<String>,
    #[validate(custom(function = "validate_link"))]
    pub link: Option<String>,
    #[validate(nested)]
    pub tags: Option<Vec<NameInput>>,
    #[validate(nested)]
    pub ingredients: Option<Vec<NameInput>>,
}

impl UpdateRecipeRequest {
    pub fn changes(&self) -> RecipeChanges<'_> {
        RecipeChanges {
            title: self.title.as_deref().map(str::trim),
            time_minutes: self.time_minutes,
            price: self.price.clone(),
            description: self.description.as_deref().map(non_blank),
            link: self.link.as_deref().map(non_blank),
            updated_at: Utc::now(),
        }
    }
}

/// Apply column changes and replace whichever relationship sets were
/// supplied, all in one transaction.
fn save(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
    changes: &RecipeChanges,
    tags: Option<&[NameInput]>,
    ingredients: Option<&[NameInput]>,
) -> Result<RecipeRow, ApiError> {
    let tags = tags.map(names);
    let ingredients = ingredients.map(names);
    let relations = Relations {
        tags: tags.as_deref(),
        ingredients: ingredients.as_deref(),
    };

    conn.transaction(|conn| {
        let recipe =
            recipes::update(conn, user_id, id, changes)?.ok_or(ApiError::NotFound("Recipe"))?;
        recipes::attach(conn, user_id, recipe.id, relations)?;
        Ok(recipes::load_row(conn, recipe)?)
    })
}

#[utoipa::path(
    put,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    request_body = CreateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = RecipeDetail),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn replace_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    State(media): State<Arc<MediaStore>>,
    Path(id): Path<i64>,
    ValidJson(request): ValidJson<CreateRecipeRequest>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let mut conn = pool.get()?;
    let row = save(
        &mut conn,
        user.id,
        id,
        &request.changes(),
        request.tags.as_deref(),
        request.ingredients.as_deref(),
    )?;
    Ok(Json(RecipeDetail::new(row, &media)))
}

#[utoipa::path(
    patch,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = RecipeDetail),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    State(media): State<Arc<MediaStore>>,
    Path(id): Path<i64>,
    ValidJson(request): ValidJson<UpdateRecipeRequest>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let mut conn = pool.get()?;
    let row = save(
        &mut conn,
        user.id,
        id,
        &request.changes(),
        request.tags.as_deref(),
        request.ingredients.as_deref(),
    )?;
    Ok(Json(RecipeDetail::new(row, &media)))
}
