use crate::api::extract::ValidJson;
use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::users;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use super::UserResponse;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    /// At least 6 characters
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,
}

#[utoipa::path(
    post,
    path = "/api/user/create",
    tag = "user",
    request_body(content = CreateUserRequest, example = json!({"email": "cook@example.com", "password": "testpass123", "name": "Cook"})),
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid email, short password or email already taken", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(pool): State<Arc<DbPool>>,
    ValidJson(request): ValidJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let mut conn = pool.get()?;
    let user = users::create_user(&mut conn, &request.email, &request.password, &request.name)?;
    Ok((StatusCode::CREATED, Json(user.into())))
}
