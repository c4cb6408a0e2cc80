use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    errors::Result,
    models::{
        meetme::{MeetmeView, NewMeetme},
        message::MeetmeMessage,
        user::Principal,
    },
    state::AppState,
    utils::validated_form::ValidatedJson,
};

pub fn meetme_router(config: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_meetmes).post(create_meetme))
        .route("/{id}", get(read_meetme))
        .route("/{id}/messages", get(read_messages).post(post_message))
        .with_state(config)
}

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct CreateMeetmeRequest {
    #[serde(default)]
    #[validate(length(max = 255))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub message: String,
}

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct PostMessageRequest {
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub message: String,
}

pub async fn list_meetmes(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Value>> {
    let meetmes: Vec<MeetmeView> = state
        .meetmes
        .list_for_owner(&principal)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(json!({ "meetmes": meetmes })))
}

pub async fn create_meetme(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(input): ValidatedJson<CreateMeetmeRequest>,
) -> Result<(StatusCode, Json<MeetmeView>)> {
    let meetme = state
        .meetmes
        .create_meetme(
            &principal,
            NewMeetme {
                name: input.name,
                phone: input.phone,
                message: input.message,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(meetme.into())))
}

pub async fn read_meetme(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<MeetmeView>> {
    Ok(Json(state.meetmes.get_meetme(&principal, &id).await?.into()))
}

pub async fn read_messages(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let messages = state.meetmes.list_messages(&principal, &id).await?;
    Ok(Json(json!({ "messages": messages })))
}

pub async fn post_message(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<PostMessageRequest>,
) -> Result<(StatusCode, Json<MeetmeMessage>)> {
    let message = state
        .meetmes
        .post_user_message(&principal, &id, &input.message)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
