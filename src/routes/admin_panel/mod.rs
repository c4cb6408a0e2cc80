use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde_json::{Value, json};
use tracing::warn;
use validator::Validate;

use crate::{
    consts::meetme_const::ADMIN_DEFAULT_PER_PAGE,
    errors::{Error, Result},
    models::{
        meetme::AdminMeetmeView,
        message::MeetmeMessage,
        status::MeetmeStatus,
        user::Principal,
    },
    state::AppState,
    utils::validated_form::ValidatedJson,
};

pub fn admin_router(config: AppState) -> Router<AppState> {
    Router::new()
        .route("/meetmes", get(list_meetmes))
        .route("/meetmes/{id}", get(read_meetme).delete(delete_meetme))
        .route("/meetmes/{id}/status", patch(update_status))
        .route("/meetmes/{id}/messages", post(post_message))
        .with_state(config)
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    #[validate(length(max = 32))]
    pub status: String,
}

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct AdminMessageRequest {
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub message: String,
    pub status: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct AdminMeetmeDetail {
    #[serde(flatten)]
    pub meetme: AdminMeetmeView,
    pub messages: Vec<MeetmeMessage>,
}

fn parse_status(value: &str) -> Result<MeetmeStatus> {
    value
        .trim()
        .parse()
        .map_err(|e: crate::models::status::UnknownStatus| Error::InvalidInput(e.to_string()))
}

pub async fn list_meetmes(
    State(state): State<AppState>,
    principal: Principal,
    query: core::result::Result<Query<AdminListQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let Query(query) = query?;
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => Some(parse_status(value)?),
    };
    let page = state
        .meetmes
        .list_all(
            &principal,
            status,
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(ADMIN_DEFAULT_PER_PAGE),
        )
        .await?;
    Ok(Json(json!({
        "meetmes": page.items,
        "page": page.page,
        "perPage": page.per_page,
        "totalItems": page.total_items,
        "totalPages": page.total_pages,
    })))
}

pub async fn read_meetme(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<AdminMeetmeDetail>> {
    let meetme = state.meetmes.admin_view(&principal, &id).await?;
    let messages = state.meetmes.list_messages(&principal, &id).await?;
    Ok(Json(AdminMeetmeDetail { meetme, messages }))
}

pub async fn update_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<UpdateStatusRequest>,
) -> Result<Json<Value>> {
    let status = parse_status(&input.status)?;
    let meetme = state.meetmes.set_status(&principal, &id, status).await?;
    Ok(Json(json!({
        "id": meetme.id,
        "status": meetme.status,
        "updated": meetme.updated,
    })))
}

pub async fn post_message(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<AdminMessageRequest>,
) -> Result<(StatusCode, Json<MeetmeMessage>)> {
    let explicit = match input.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => match value.parse::<MeetmeStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Ignoring status on admin message for {id}: {e}");
                None
            }
        },
    };
    let message = state
        .meetmes
        .post_admin_message(&principal, &id, &input.message, explicit)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn delete_meetme(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.meetmes.delete_meetme(&principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
