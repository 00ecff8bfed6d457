mod crypto;
mod db;
mod extractor;

pub use crypto::{hash_password, verify_password};
pub use db::{create_session, get_user_from_token, SESSION_LIFETIME_DAYS};
pub use extractor::{parse_authorization, AuthUser};
