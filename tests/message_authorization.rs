//! Message handlers run the same chains as HTTP routes

mod common;

use route_authz::message::UNAUTHORIZED_EVENT;
use route_authz::{AuthConfig, Authorizer, Connection, HandlerSpec, MessageError, MessageGuard};
use serde_json::json;
use std::sync::Mutex;

use common::{mint_token, spawn_identity_service, AUDIENCE, TENANT};

#[derive(Default)]
struct Socket {
    emitted: Mutex<Vec<String>>,
}

impl Connection for Socket {
    fn emit(&self, event: &str) {
        self.emitted.lock().unwrap().push(event.to_string());
    }
}

async fn guard() -> MessageGuard {
    let identity_url = spawn_identity_service().await;
    let authorizer = Authorizer::builder(AuthConfig::new(identity_url, TENANT).audience(AUDIENCE))
        .build()
        .unwrap();

    MessageGuard::with_handlers(
        authorizer,
        [
            HandlerSpec::new("books:list").scope(["read:books"]),
            HandlerSpec::new("tenant:users").scope(["{path.tenantId}:read:users"]).path_param("tenantId"),
            HandlerSpec::new("staff:report").access_level("staff"),
            HandlerSpec::new("admin:purge").access_level("admin"),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn staff_message_is_allowed() {
    let guard = guard().await;
    let socket = Socket::default();

    let ctx = guard
        .authorize("staff:report", &socket, &json!({"token": "staff-token"}))
        .await
        .unwrap();
    assert_eq!(ctx.identity.unwrap().username, "sam");
    assert!(socket.emitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn user_message_to_admin_handler_is_forbidden() {
    let guard = guard().await;
    let socket = Socket::default();

    let err = guard
        .authorize("admin:purge", &socket, &json!({"authToken": "user-token"}))
        .await
        .unwrap_err();
    assert_eq!(err.code, 403);
    assert_eq!(err.error_type, "ForbiddenError");
    assert_eq!(*socket.emitted.lock().unwrap(), vec![UNAUTHORIZED_EVENT.to_string()]);
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let guard = guard().await;
    let socket = Socket::default();

    let err = guard.authorize("admin:purge", &socket, &json!({})).await.unwrap_err();
    assert_eq!(
        err,
        MessageError {
            code: 401,
            message: "Authorization Bearer token is required".to_string(),
            error_type: "UnauthorizedError".to_string(),
        }
    );
    assert_eq!(socket.emitted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rs256_scopes_on_messages() {
    let guard = guard().await;
    let socket = Socket::default();

    assert!(guard
        .authorize("books:list", &socket, &json!({"token": mint_token("read:books", AUDIENCE)}))
        .await
        .is_ok());

    let err = guard
        .authorize(
            "books:list",
            &socket,
            &json!({"token": mint_token("read:books", "https://other.example.com")}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, 401);
    assert_eq!(err.message, "Invalid token: jwt audience invalid");
}

#[tokio::test]
async fn payload_fields_expand_scope_templates() {
    let guard = guard().await;
    let socket = Socket::default();
    let token = mint_token("ls:read:users", AUDIENCE);

    assert!(guard
        .authorize("tenant:users", &socket, &json!({"token": token, "tenantId": "ls"}))
        .await
        .is_ok());

    let err = guard
        .authorize("tenant:users", &socket, &json!({"token": token, "tenantId": "nih"}))
        .await
        .unwrap_err();
    assert_eq!(err.code, 403);
    assert_eq!(
        err.message,
        "Insufficient scope. Required scopes: {path.tenantId}:read:users"
    );
}

#[tokio::test]
async fn invalid_profile_is_unauthorized() {
    let guard = guard().await;
    let socket = Socket::default();

    let err = guard
        .authorize("staff:report", &socket, &json!({"token": "bad-email-token"}))
        .await
        .unwrap_err();
    assert_eq!(err.code, 401);
    assert_eq!(
        err.message,
        "User profile is invalid: email is not a valid email address."
    );
}
