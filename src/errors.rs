use argon2::password_hash::Error as ArError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jsonwebtoken::errors::Error as JWError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Argon 2 Error: {0}")]
    Argon2Error(#[from] ArError),

    #[error("Jason web token Error: {0}")]
    JwTError(#[from] JWError),

    #[error("Store Error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Config Error: {0}")]
    ConfigError(#[from] figment::Error),

    #[error("Insecure configuration: {0}")]
    InsecureConfig(String),

    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Validator Error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Json Rejection Error: {0}")]
    AxumJsonRejection(#[from] axum::extract::rejection::JsonRejection),

    #[error("Query Rejection Error: {0}")]
    AxumQueryRejection(#[from] axum::extract::rejection::QueryRejection),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Meetme not found")]
    MeetmeNotFound,

    #[error("You already have an open meetme `{0}`")]
    OpenMeetmeExists(String),

    #[error("Invalid admin credentials")]
    InvalidAdminCredentials,

    // ! Auth
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid authorization token")]
    InvalidToken,
    #[error("Invalid authorization scheme")]
    InvalidScheme,
    #[error("Token expired")]
    TokenExpired,
    #[error("User not found")]
    SubjectNotFound,
    #[error("Invalid or expired token")]
    InvalidProviderToken,
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Error".to_string(),
    )
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::Argon2Error(error) => {
                error!("Argon 2 Error:{:#?}", error);
                internal()
            }
            Error::JwTError(error) => {
                error!("JWT Error:{:#?}", error);
                internal()
            }
            Error::StoreError(StoreError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "Not Found".to_string())
            }
            Error::StoreError(error) => {
                error!("Store Error:{:#?}", error);
                internal()
            }
            Error::ConfigError(error) => {
                error!("Config Error:{:#?}", error);
                internal()
            }
            Error::InsecureConfig(detail) => {
                error!("Insecure configuration: {detail}");
                internal()
            }
            Error::IoError(error) => {
                error!("Io Error:{:#?}", error);
                internal()
            }
            Error::ValidationError(error) => {
                let message = format!("Input validation error: [{}]", error).replace('\n', ", ");
                (StatusCode::BAD_REQUEST, message)
            }
            Error::AxumJsonRejection(error) => (StatusCode::BAD_REQUEST, error.body_text()),
            Error::AxumQueryRejection(error) => (StatusCode::BAD_REQUEST, error.body_text()),
            Error::InvalidInput(message) | Error::InvalidState(message) => {
                (StatusCode::BAD_REQUEST, message)
            }
            Error::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            Error::MeetmeNotFound => (StatusCode::NOT_FOUND, "Meetme not found".to_string()),
            Error::OpenMeetmeExists(existing_id) => {
                let body = json!({
                    "error": "You already have an open meetme. You can create a new one only after the current one is completed or rejected.",
                    "existingMeetmeId": existing_id,
                });
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            Error::InvalidAdminCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid admin credentials".to_string(),
            ),
            Error::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "Missing authorization token".to_string(),
            ),
            Error::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Invalid authorization token".to_string(),
            ),
            Error::InvalidScheme => (
                StatusCode::UNAUTHORIZED,
                "Invalid authorization scheme".to_string(),
            ),
            Error::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired".to_string()),
            Error::SubjectNotFound => (StatusCode::UNAUTHORIZED, "User not found".to_string()),
            Error::InvalidProviderToken => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token".to_string(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn conflict_carries_existing_id() {
        let response = Error::OpenMeetmeExists("abc123".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["existingMeetmeId"], "abc123");
        assert!(body["error"].as_str().unwrap().contains("open meetme"));
    }

    #[tokio::test]
    async fn store_failures_do_not_leak_detail() {
        let response =
            Error::StoreError(StoreError::Backend("table meetmes is locked".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal Error");
    }

    #[tokio::test]
    async fn taxonomy_maps_to_status_codes() {
        let cases = [
            (Error::MissingToken, StatusCode::UNAUTHORIZED),
            (Error::TokenExpired, StatusCode::UNAUTHORIZED),
            (Error::SubjectNotFound, StatusCode::UNAUTHORIZED),
            (Error::Forbidden("Access denied".into()), StatusCode::FORBIDDEN),
            (Error::MeetmeNotFound, StatusCode::NOT_FOUND),
            (Error::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidState("wait".into()), StatusCode::BAD_REQUEST),
            (
                Error::StoreError(StoreError::not_found("meetmes", "x")),
                StatusCode::NOT_FOUND,
            ),
            (Error::StoreError(StoreError::Timeout), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
