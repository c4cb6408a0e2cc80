use axum::{Router, routing::post};

use crate::{
    routes::auth_route::user::{admin_login, oauth_callback},
    state::AppState,
};

pub mod user;

pub fn auth_router(config: AppState) -> Router<AppState> {
    Router::new()
        .route("/oauth-callback", post(oauth_callback))
        .route("/admin-login", post(admin_login))
        .with_state(config)
}
