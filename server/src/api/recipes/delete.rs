use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::media::MediaStore;
use crate::queries::recipes;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    responses(
        (status = 204, description = "Recipe deleted successfully"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    State(media): State<Arc<MediaStore>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let mut conn = pool.get()?;

    let image = recipes::delete(&mut conn, user.id, id)?.ok_or(ApiError::NotFound("Recipe"))?;

    // Tags and ingredients stay; only the association rows cascade.
    if let Some(key) = image {
        if let Err(e) = media.remove(&key) {
            tracing::warn!(recipe_id = id, "Failed to remove image {}: {}", key, e);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
