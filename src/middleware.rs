use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    errors::{Error, Result as RResult},
    models::{
        permission::{Action, PermissionChecker},
        user::Principal,
    },
    state::AppState,
};

pub async fn auth_jwt_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, Response> {
    let (mut parts, body) = request.into_parts();
    let principal = authenticate(&state, &parts)
        .await
        .map_err(IntoResponse::into_response)?;

    parts.extensions.insert(principal);

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Must run after [`auth_jwt_middleware`].
pub async fn require_admin(
    principal: Principal,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, Response> {
    principal
        .check_permission(Action::Administer, None)
        .map_err(IntoResponse::into_response)?;
    Ok(next.run(request).await)
}

async fn authenticate(state: &AppState, parts: &Parts) -> RResult<Principal> {
    let token = bearer_token(parts)?;
    state.identity.resolve(token).await
}

fn bearer_token(parts: &Parts) -> RResult<&str> {
    let header_value = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(Error::MissingToken)?
        .to_str()
        .map_err(|_| Error::InvalidToken)?;

    let mut parts = header_value.trim().splitn(2, ' ');

    let scheme = parts.next().ok_or(Error::MissingToken)?;
    let token = parts.next().map(str::trim).ok_or(Error::MissingToken)?;

    if !scheme.eq_ignore_ascii_case("Bearer") {
        tracing::warn!("Invalid auth scheme: {scheme}");
        return Err(Error::InvalidScheme);
    }
    if token.is_empty() {
        return Err(Error::MissingToken);
    }
    Ok(token)
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> RResult<Self> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(Error::MissingToken)
    }
}
