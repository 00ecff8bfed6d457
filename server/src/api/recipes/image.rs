use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::media::{validate_image, ImageError, MediaStore};
use crate::queries::recipes;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct RecipeImageRequest {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeImageResponse {
    pub id: i64,
    /// Public URL of the stored image
    pub image: String,
}

impl From<ImageError> for ApiError {
    fn from(error: ImageError) -> Self {
        ApiError::field("image", error.to_string())
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/image",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    request_body(content_type = "multipart/form-data", content = RecipeImageRequest),
    responses(
        (status = 200, description = "Image stored and attached", body = RecipeImageResponse),
        (status = 400, description = "Missing, oversized or invalid image", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_recipe_image(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    State(media): State<Arc<MediaStore>>,
    Path(id): Path<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RecipeImageResponse>, ApiError> {
    {
        let mut conn = pool.get()?;
        recipes::find(&mut conn, user.id, id)?.ok_or(ApiError::NotFound("Recipe"))?;
    }

    let mut multipart = multipart.map_err(|rejection| ApiError::invalid(rejection.body_text()))?;

    let mut data = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            data = Some(field.bytes().await?);
        }
    }

    let data = data.ok_or(ImageError::Missing)?;
    if data.len() > media.max_file_size() {
        return Err(ImageError::TooLarge {
            max: media.max_file_size(),
        }
        .into());
    }
    let format = validate_image(&data)?;

    let key = media
        .save_recipe_image(&data, format)
        .map_err(|source| ApiError::Io {
            context: "Failed to store image",
            source,
        })?;

    let mut conn = pool.get()?;
    let previous = match recipes::replace_image(&mut conn, user.id, id, &key) {
        Ok(Some((_, previous))) => previous,
        Ok(None) => {
            discard(&media, &key);
            return Err(ApiError::NotFound("Recipe"));
        }
        Err(e) => {
            discard(&media, &key);
            return Err(e.into());
        }
    };

    if let Some(old) = previous.filter(|old| *old != key) {
        discard(&media, &old);
    }

    tracing::info!(recipe_id = id, key = %key, "stored recipe image");
    Ok(Json(RecipeImageResponse {
        id,
        image: media.url(&key),
    }))
}

fn discard(media: &MediaStore, key: &str) {
    if let Err(e) = media.remove(key) {
        tracing::warn!("Failed to remove image {}: {}", key, e);
    }
}
