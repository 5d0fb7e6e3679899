//! Identity resolution against the remote identity service
//!
//! The profile endpoint is `<authUrl>/auth/<tenant>/me`, or `<authUrl>/auth/me`
//! in the tenant-less legacy form. One outbound call is made per resolution and
//! the returned profile is validated before an [`Identity`] is produced.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::OnceLock;

use crate::auth::error::AuthError;
use crate::auth::roles::{role_from_value, Role};
use crate::credential::{Credentials, REFRESH_TOKEN_HEADER};

/// An authenticated user, valid for one request or message cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Space-delimited granted scopes, if the profile carries any
    pub scope: Option<String>,
    /// The profile as returned by the identity service
    pub profile: Value,
}

/// Resolves a credential to an identity
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, credentials: &Credentials) -> Result<Identity, AuthError>;
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
            .expect("valid email pattern")
    })
}

/// Validate a raw profile and turn it into an [`Identity`].
///
/// Every failed field is listed in the returned `InvalidProfile` diagnostic.
pub fn validate_profile(profile: Value) -> Result<Identity, AuthError> {
    let mut problems = Vec::new();

    let email = match profile.get("email") {
        None | Some(Value::Null) => {
            problems.push("email is required.".to_string());
            None
        }
        Some(Value::String(email)) if email_pattern().is_match(email) => Some(email.clone()),
        Some(Value::String(_)) => {
            problems.push("email is not a valid email address.".to_string());
            None
        }
        Some(_) => {
            problems.push("email must be of string type.".to_string());
            None
        }
    };

    let username = match profile.get("username") {
        None | Some(Value::Null) => {
            problems.push("username is required.".to_string());
            None
        }
        Some(Value::String(username)) if !username.trim().is_empty() => Some(username.clone()),
        Some(Value::String(_)) => {
            problems.push("username must not be empty.".to_string());
            None
        }
        Some(_) => {
            problems.push("username must be of string type.".to_string());
            None
        }
    };

    match (email, username) {
        (Some(email), Some(username)) => Ok(Identity {
            username,
            email,
            role: role_from_value(profile.get("role")),
            scope: profile.get("scope").and_then(Value::as_str).map(str::to_string),
            profile,
        }),
        _ => Err(AuthError::InvalidProfile(problems.join(" "))),
    }
}

/// Identity resolver backed by the identity service's profile endpoint
#[derive(Clone)]
pub struct HttpIdentityResolver {
    http_client: Client,
    profile_url: String,
}

impl HttpIdentityResolver {
    pub fn new(profile_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), profile_url)
    }

    pub fn with_client(http_client: Client, profile_url: impl Into<String>) -> Self {
        Self {
            http_client,
            profile_url: profile_url.into(),
        }
    }

    pub fn profile_url(&self) -> &str {
        &self.profile_url
    }

    /// Fetch the raw profile for a credential without validating it
    pub async fn fetch_profile(&self, credentials: &Credentials) -> Result<Value, AuthError> {
        let token = credentials.token().ok_or(AuthError::MissingCredential)?;

        tracing::debug!("Fetching user profile from: {}", self.profile_url);

        let mut request = self
            .http_client
            .get(&self.profile_url)
            .header("Accept", "application/json")
            .bearer_auth(token);
        if let Some(refresh_token) = &credentials.refresh_token {
            request = request.header(REFRESH_TOKEN_HEADER, refresh_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::IdentityUnavailable(format!("Failed to fetch user profile: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Identity service answered with status: {}", status);
            return Err(AuthError::UpstreamAuthFailure(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::IdentityUnavailable(format!("Failed to parse user profile: {}", e)))
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let profile = self.fetch_profile(credentials).await?;
        validate_profile(profile).inspect_err(|e| {
            tracing::warn!("Rejected user profile from {}: {}", self.profile_url, e);
        })
    }
}
