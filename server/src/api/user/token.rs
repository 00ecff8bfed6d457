use crate::api::extract::ValidJson;
use crate::api::ErrorResponse;
use crate::auth::create_session;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::users;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub email: String,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/user/token",
    tag = "user",
    request_body(content = TokenRequest, example = json!({"email": "cook@example.com", "password": "testpass123"})),
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn create_token(
    State(pool): State<Arc<DbPool>>,
    ValidJson(request): ValidJson<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut conn = pool.get()?;

    let user = users::authenticate(&mut conn, &request.email, &request.password)?
        .ok_or_else(|| ApiError::invalid("Unable to authenticate with provided credentials."))?;

    let token = create_session(&mut conn, user.id)?;
    tracing::debug!(user_id = user.id, "issued token");

    Ok(Json(TokenResponse { token }))
}
