pub mod create;
pub mod me;
pub mod token;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::models::User;

/// Returns the router for /api/user endpoints (mounted at /api/user).
/// `create` and `token` are public; `me` requires a token.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create::create_user))
        .route("/token", post(token::create_token))
        .route("/me", get(me::get_me).patch(me::update_me))
}

/// Public view of an account; never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::create_user,
        token::create_token,
        me::get_me,
        me::update_me,
    ),
    components(schemas(
        UserResponse,
        create::CreateUserRequest,
        token::TokenRequest,
        token::TokenResponse,
        me::UpdateMeRequest,
    ))
)]
pub struct ApiDoc;
