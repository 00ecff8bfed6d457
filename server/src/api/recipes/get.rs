use crate::api::catalog::CatalogEntry;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::media::MediaStore;
use crate::price;
use crate::queries::recipes::{self, RecipeRow};
use axum::{
    extract::{Path, State},
    Json,
};
use bigdecimal::BigDecimal;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Full recipe representation, returned by retrieve, create and update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    #[serde(serialize_with = "price::serialize")]
    #[schema(value_type = String, example = "5.50")]
    pub price: BigDecimal,
    pub link: Option<String>,
    pub tags: Vec<CatalogEntry>,
    pub ingredients: Vec<CatalogEntry>,
    pub description: Option<String>,
    /// Public URL of the uploaded image
    pub image: Option<String>,
    /// Owner's user ID
    pub user: i64,
}

impl RecipeDetail {
    pub fn new(row: RecipeRow, media: &MediaStore) -> Self {
        let recipe = row.recipe;
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
            tags: row.tags.into_iter().map(CatalogEntry::from).collect(),
            ingredients: row.ingredients.into_iter().map(CatalogEntry::from).collect(),
            description: recipe.description,
            image: recipe.image.as_deref().map(|key| media.url(key)),
            user: recipe.user_id,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe details", body = RecipeDetail),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    State(media): State<Arc<MediaStore>>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let mut conn = pool.get()?;

    let recipe = recipes::find(&mut conn, user.id, id)?.ok_or(ApiError::NotFound("Recipe"))?;
    let row = recipes::load_row(&mut conn, recipe)?;

    Ok(Json(RecipeDetail::new(row, &media)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Recipe, Tag};
    use chrono::Utc;
    use std::str::FromStr;

    #[test]
    fn test_detail_serialization() {
        let now = Utc::now();
        let row = RecipeRow {
            recipe: Recipe {
                id: 3,
                user_id: 9,
                title: "Soup".to_string(),
                time_minutes: 20,
                price: BigDecimal::from_str("4.5").unwrap(),
                description: None,
                link: Some("https://example.com/soup".to_string()),
                image: Some("uploads/recipe/abc.png".to_string()),
                created_at: now,
                updated_at: now,
            },
            tags: vec![Tag {
                id: 1,
                user_id: 9,
                name: "Winter".to_string(),
            }],
            ingredients: vec![],
        };
        let media = MediaStore::new("/tmp/unused", "/media/", 1024);

        let body = serde_json::to_value(RecipeDetail::new(row, &media)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "id": 3,
                "title": "Soup",
                "time_minutes": 20,
                "price": "4.50",
                "link": "https://example.com/soup",
                "tags": [{"id": 1, "name": "Winter"}],
                "ingredients": [],
                "description": null,
                "image": "/media/uploads/recipe/abc.png",
                "user": 9
            })
        );
    }
}
