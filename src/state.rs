use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::jwt::JwtKeys;
use crate::users::repo::UserRepository;
use crate::users::service::UserService;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(repo: Arc<dyn UserRepository>, jwt: JwtKeys) -> Self {
        Self {
            users: UserService::new(repo, jwt.clone()),
            jwt,
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
