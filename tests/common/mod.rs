//! Shared fixtures: a fake identity service (JWKS + profile endpoints) and
//! RS256 token minting.

#![allow(dead_code)]

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

pub const TENANT: &str = "ls";
pub const AUDIENCE: &str = "https://api.example.com";
pub const KID: &str = "key-1";

const SIGNING_KEY: &[u8] = include_bytes!("../fixtures/signing_key.pem");
const MODULUS: &str = "1TY-EwzZSGuqxfaKqyWbsk2g4qef_RLi-gIj8U255WhP8cMXIG8CC-TMcq2jmaBi6UOLgD6wUi1JgdSVbOHqMnwl63Bj3MN8-GAjpuiGfSkxpcmVMWtq9oZDRM7WLjqZeewFgrQkjQ0Ivu0dTu439YMzn8Iz1upBOen6MHUyaAlhTvIJaS4zv99XQgG127yH2Uq7aumiXta4skv774AHBB_RP8jULBeui8BDdUeCLrzwIFnWm1R5M_a8J9hMypkGKE0C2hlg48z_UlzgwXz55f2v4X3wDq0RE5T8BXUNKguzgXGWH4HYtsC7upnRSWmA3-6g9sHkl_3Vw9ZEIwuVYQ";

/// Serve a router on an ephemeral local port and return its base URL
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn jwks() -> Json<Value> {
    Json(json!({
        "keys": [
            {"kty": "RSA", "kid": KID, "use": "sig", "alg": "RS256", "n": MODULUS, "e": "AQAB"}
        ]
    }))
}

/// Profiles keyed by opaque session token
async fn profile(headers: HeaderMap) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let profile = match token {
        Some("staff-token") => json!({"username": "sam", "email": "sam@example.com", "role": "staff"}),
        Some("user-token") => json!({"username": "uma", "email": "uma@example.com", "role": "user"}),
        Some("admin-token") => json!({"username": "ada", "email": "ada@example.com", "role": "admin"}),
        Some("bad-email-token") => json!({"username": "eve", "email": "not-an-email", "role": "admin"}),
        _ => return StatusCode::UNAUTHORIZED.into_response(),
    };

    let mut response = Json(profile).into_response();
    if let Some(refresh) = headers.get("refresh-token") {
        response.headers_mut().insert("x-seen-refresh-token", refresh.clone());
    }
    response
}

/// Start the identity service and return its base URL
pub async fn spawn_identity_service() -> String {
    let app = Router::new()
        .route(&format!("/auth/{TENANT}/.well-known/jwks.json"), get(jwks))
        .route(&format!("/auth/{TENANT}/me"), get(profile));
    spawn(app).await
}

/// Mint an RS256 token signed with the key published by the identity service
pub fn mint_token(scope: &str, audience: &str) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    encode(
        &header,
        &json!({
            "sub": "user123",
            "aud": audience,
            "scope": scope,
            "iat": now,
            "exp": now + 600,
        }),
        &EncodingKey::from_rsa_pem(SIGNING_KEY).unwrap(),
    )
    .unwrap()
}
