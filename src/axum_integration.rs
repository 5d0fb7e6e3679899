//! Axum extractors for authorization results
//!
//! [`AuthorizeLayer`](crate::auth::AuthorizeLayer) leaves the verified claims
//! and the resolved identity in the request extensions. These extractors hand
//! them to handlers.
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{routing::get, Router};
//! use route_authz::axum_integration::{AuthenticatedUser, VerifiedClaims};
//!
//! async fn whoami(user: AuthenticatedUser) -> String {
//!     format!("{} ({})", user.username, user.role.name)
//! }
//!
//! async fn subject(claims: VerifiedClaims) -> String {
//!     claims.sub.clone().unwrap_or_default()
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use serde_json::Value;
use std::ops::Deref;

use crate::auth::claims::Claims;
use crate::auth::error::AuthError;
use crate::identity::Identity;

/// Claims of a token that passed the scope gate
#[derive(Debug, Clone)]
pub struct VerifiedClaims(pub Claims);

impl Deref for VerifiedClaims {
    type Target = Claims;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl VerifiedClaims {
    pub fn into_inner(self) -> Claims {
        self.0
    }
}

impl<S> FromRequestParts<S> for VerifiedClaims
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(Self)
            .ok_or(AuthError::MissingToken)
    }
}

/// Identity of a caller that passed the role gate
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl Deref for AuthenticatedUser {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AuthenticatedUser {
    pub fn into_inner(self) -> Identity {
        self.0
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Self)
            .ok_or(AuthError::MissingCredential)
    }
}

/// Raw identity-service profile attached by
/// [`UserInfoLayer`](crate::auth::UserInfoLayer)
#[derive(Debug, Clone)]
pub struct UserInfo(pub Value);

impl Deref for UserInfo {
    type Target = Value;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl UserInfo {
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl<S> FromRequestParts<S> for UserInfo
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserInfo>()
            .cloned()
            .ok_or(AuthError::MissingCredential)
    }
}
