use axum::{Json, Router, middleware, routing::get};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{auth_jwt_middleware, require_admin},
    routes::{admin_panel::admin_router, auth_route::auth_router, meetme_route::meetme_router},
    state::AppState,
};

pub mod admin_panel;
pub mod auth_route;
pub mod meetme_route;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_router(state.clone()))
        .nest(
            "/meetmes",
            meetme_router(state.clone()).layer(middleware::from_fn_with_state(
                state.clone(),
                auth_jwt_middleware,
            )),
        )
        .nest(
            "/admin",
            admin_router(state.clone())
                .layer(middleware::from_fn(require_admin))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_jwt_middleware,
                )),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        store::memory::MemoryStore,
        test_support::{memory_config, seed_user},
    };

    struct TestApp {
        state: AppState,
        store: MemoryStore,
    }

    impl TestApp {
        fn new() -> Self {
            let store = MemoryStore::new();
            let state = AppState::with_store(memory_config(), Arc::new(store.clone())).unwrap();
            TestApp { state, store }
        }

        async fn user(&self, email: &str) -> String {
            let id = seed_user(&self.store, email, false).await;
            self.state.identity.issue_token(&id, false).unwrap()
        }

        async fn admin(&self) -> String {
            let id = seed_user(&self.store, "ops@example.com", true).await;
            self.state.identity.issue_token(&id, true).unwrap()
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = app(self.state.clone()).oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }
    }

    fn alice_meetme() -> Value {
        json!({ "name": "Alice", "phone": "555-1", "message": "Hi" })
    }

    #[tokio::test]
    async fn health_needs_no_credentials() {
        let app = TestApp::new();
        let (status, body) = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn protected_routes_require_a_bearer_token() {
        let app = TestApp::new();
        let (status, body) = app.send(Method::GET, "/meetmes", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing authorization token");

        let (status, _) = app
            .send(Method::GET, "/meetmes", Some("garbage"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_then_conflict_then_reopen_after_completion() {
        let app = TestApp::new();
        let alice = app.user("alice@example.com").await;
        let admin = app.admin().await;

        let (status, first) = app
            .send(Method::POST, "/meetmes", Some(&alice), Some(alice_meetme()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["status"], "pending");
        assert_eq!(first["requestId"], 1);
        assert_eq!(first["subject"], "Hidden");

        let (status, conflict) = app
            .send(Method::POST, "/meetmes", Some(&alice), Some(alice_meetme()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(conflict["existingMeetmeId"], first["id"]);

        let uri = format!("/admin/meetmes/{}/status", first["id"].as_str().unwrap());
        let (status, updated) = app
            .send(Method::PATCH, &uri, Some(&admin), Some(json!({ "status": "completed" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "completed");
        assert_eq!(updated["id"], first["id"]);

        let (status, second) = app
            .send(Method::POST, "/meetmes", Some(&alice), Some(alice_meetme()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(second["requestId"], 2);
    }

    #[tokio::test]
    async fn user_reply_while_awaiting_keeps_status() {
        let app = TestApp::new();
        let alice = app.user("alice@example.com").await;
        let admin = app.admin().await;
        let (_, meetme) = app
            .send(Method::POST, "/meetmes", Some(&alice), Some(alice_meetme()))
            .await;
        let id = meetme["id"].as_str().unwrap();

        let messages = format!("/meetmes/{id}/messages");
        let (status, body) = app
            .send(Method::POST, &messages, Some(&alice), Some(json!({ "message": "thanks" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Awaiting Reply"));

        app.send(
            Method::PATCH,
            &format!("/admin/meetmes/{id}/status"),
            Some(&admin),
            Some(json!({ "status": "awaiting_reply" })),
        )
        .await;
        let (status, message) = app
            .send(Method::POST, &messages, Some(&alice), Some(json!({ "message": "thanks" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(message["authorType"], "user");

        let (_, detail) = app
            .send(Method::GET, &format!("/meetmes/{id}"), Some(&alice), None)
            .await;
        assert_eq!(detail["status"], "awaiting_reply");

        let (_, thread) = app.send(Method::GET, &messages, Some(&alice), None).await;
        let bodies: Vec<_> = thread["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["message"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(bodies, ["Hi", "thanks"]);
    }

    #[tokio::test]
    async fn admin_message_puts_meetme_in_progress() {
        let app = TestApp::new();
        let alice = app.user("alice@example.com").await;
        let admin = app.admin().await;
        let (_, meetme) = app
            .send(Method::POST, "/meetmes", Some(&alice), Some(alice_meetme()))
            .await;
        let id = meetme["id"].as_str().unwrap();

        let (status, message) = app
            .send(
                Method::POST,
                &format!("/admin/meetmes/{id}/messages"),
                Some(&admin),
                Some(json!({ "message": "Looking into it", "status": "not-a-status" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(message["authorType"], "admin");

        let (status, detail) = app
            .send(Method::GET, &format!("/admin/meetmes/{id}"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["status"], "in_progress");
        assert_eq!(detail["userEmail"], "alice@example.com");
        assert_eq!(detail["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn strangers_see_nothing() {
        let app = TestApp::new();
        let alice = app.user("alice@example.com").await;
        let bob = app.user("bob@example.com").await;
        let (_, meetme) = app
            .send(Method::POST, "/meetmes", Some(&alice), Some(alice_meetme()))
            .await;
        let id = meetme["id"].as_str().unwrap();

        let (status, body) = app
            .send(Method::GET, &format!("/meetmes/{id}"), Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.get("name").is_none());

        let (status, _) = app
            .send(Method::GET, &format!("/meetmes/{id}/messages"), Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, own) = app.send(Method::GET, "/meetmes", Some(&bob), None).await;
        assert_eq!(own["meetmes"], json!([]));

        let (status, body) = app
            .send(Method::GET, "/admin/meetmes", Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Admin access required");
    }

    #[tokio::test]
    async fn missing_fields_and_unknown_ids() {
        let app = TestApp::new();
        let alice = app.user("alice@example.com").await;
        let admin = app.admin().await;

        let (status, body) = app
            .send(Method::POST, "/meetmes", Some(&alice), Some(json!({ "name": "Alice" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Name, phone, and message are required");

        let (status, _) = app
            .send(Method::GET, "/meetmes/doesnotexist", Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app
            .send(
                Method::PATCH,
                "/admin/meetmes/doesnotexist/status",
                Some(&admin),
                Some(json!({ "status": "closed" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid status"));
    }

    #[tokio::test]
    async fn admin_list_pages_and_filters() {
        let app = TestApp::new();
        let admin = app.admin().await;
        for n in 0..3 {
            let token = app.user(&format!("user{n}@example.com")).await;
            app.send(Method::POST, "/meetmes", Some(&token), Some(alice_meetme()))
                .await;
        }

        let (status, page) = app
            .send(Method::GET, "/admin/meetmes?page=1&perPage=2", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["meetmes"].as_array().unwrap().len(), 2);
        assert_eq!(page["totalItems"], 3);
        assert_eq!(page["totalPages"], 2);
        assert_eq!(page["perPage"], 2);

        let (_, pending) = app
            .send(Method::GET, "/admin/meetmes?status=pending", Some(&admin), None)
            .await;
        assert_eq!(pending["totalItems"], 3);

        let (status, _) = app
            .send(Method::GET, "/admin/meetmes?status=bogus", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_delete_removes_meetme() {
        let app = TestApp::new();
        let alice = app.user("alice@example.com").await;
        let admin = app.admin().await;
        let (_, meetme) = app
            .send(Method::POST, "/meetmes", Some(&alice), Some(alice_meetme()))
            .await;
        let uri = format!("/admin/meetmes/{}", meetme["id"].as_str().unwrap());

        let (status, _) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_login_issues_working_credential() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                Method::POST,
                "/auth/admin-login",
                None,
                Some(json!({ "email": "admin@meetme.local", "password": "desk-admin-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["isAdmin"], true);

        let token = body["token"].as_str().unwrap();
        let (status, _) = app
            .send(Method::GET, "/admin/meetmes", Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/admin-login",
                None,
                Some(json!({ "email": "admin@meetme.local", "password": "guess" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid admin credentials");
    }

    #[tokio::test]
    async fn oauth_callback_requires_token() {
        let app = TestApp::new();
        let (status, body) = app
            .send(Method::POST, "/auth/oauth-callback", None, Some(json!({ "record": {} })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Token is required");

        let (status, _) = app
            .send(
                Method::POST,
                "/auth/oauth-callback",
                None,
                Some(json!({ "token": "not-a-jwt" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
