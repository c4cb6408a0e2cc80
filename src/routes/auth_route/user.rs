use axum::{Json, extract::State};
use serde_json::Value;

use crate::{
    errors::Result,
    services::auth::Session,
    state::AppState,
    utils::validated_form::ValidatedJson,
};

#[derive(Debug, Clone, serde::Deserialize, validator::Validate)]
pub struct OauthCallbackRequest {
    #[serde(default)]
    #[validate(length(max = 8192))]
    pub token: String,
    /// Provider-side user record; accepted for client compatibility, never trusted.
    #[serde(default)]
    pub record: Option<Value>,
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<OauthCallbackRequest>,
) -> Result<Json<Session>> {
    Ok(Json(state.auth.oauth_login(&input.token).await?))
}

#[derive(Debug, Clone, serde::Deserialize, validator::Validate)]
pub struct AdminLoginRequest {
    #[serde(default)]
    #[validate(length(max = 255))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub password: String,
}

pub async fn admin_login(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<AdminLoginRequest>,
) -> Result<Json<Session>> {
    Ok(Json(
        state.auth.admin_login(&input.email, &input.password).await?,
    ))
}
