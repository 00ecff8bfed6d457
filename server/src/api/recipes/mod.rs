pub mod create;
pub mod delete;
pub mod get;
pub mod image;
pub mod list;
pub mod update;

use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Room for multipart boundaries and headers around the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router(max_image_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes).post(create::create_recipe))
        .route(
            "/{id}",
            get(get::get_recipe)
                .put(update::replace_recipe)
                .patch(update::update_recipe)
                .delete(delete::delete_recipe),
        )
        .route(
            "/{id}/image",
            post(image::upload_recipe_image)
                .layer(DefaultBodyLimit::max(max_image_bytes + MULTIPART_OVERHEAD)),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list::list_recipes,
        create::create_recipe,
        get::get_recipe,
        update::replace_recipe,
        update::update_recipe,
        delete::delete_recipe,
        image::upload_recipe_image,
    ),
    components(schemas(
        list::RecipeSummary,
        get::RecipeDetail,
        create::CreateRecipeRequest,
        update::UpdateRecipeRequest,
        image::RecipeImageRequest,
        image::RecipeImageResponse,
    ))
)]
pub struct ApiDoc;
