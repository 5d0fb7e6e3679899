use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Per-request authentication and authorization failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No credential accompanied a request that needs an identity
    #[error("Authorization Bearer token is required")]
    MissingCredential,

    /// No bearer token accompanied a request that needs one
    #[error("Missing authentication token")]
    MissingToken,

    /// Signature, expiry, not-before, audience or issuer check failed
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The signing key for the token could not be obtained
    #[error("Unable to resolve signing key: {0}")]
    KeyResolutionFailure(String),

    #[error("Token has been revoked")]
    TokenRevoked,

    /// The identity service answered with a non-success status
    #[error("Identity service rejected the credential with status {0}")]
    UpstreamAuthFailure(u16),

    /// The identity service could not be reached or answered garbage
    #[error("Identity service unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("User profile is invalid: {0}")]
    InvalidProfile(String),

    /// None of the required scopes were granted. Holds the unexpanded templates.
    #[error("Insufficient scope. Required scopes: {}", .0.join(" "))]
    InsufficientScope(Vec<String>),

    /// The identity's role does not satisfy the access level
    #[error("Insufficient role for access level: {0}")]
    DeniedRole(String),
}

impl AuthError {
    /// 401 for authentication failures, 403 for authorization failures
    pub fn status_code(&self) -> StatusCode {
        if self.is_authentication_failure() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::FORBIDDEN
        }
    }

    pub fn is_authentication_failure(&self) -> bool {
        !matches!(
            self,
            AuthError::InsufficientScope(_) | AuthError::DeniedRole(_)
        )
    }

    /// Error type label used on the message callback channel
    pub fn error_type(&self) -> &'static str {
        if self.is_authentication_failure() {
            "UnauthorizedError"
        } else {
            "ForbiddenError"
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AuthError::InvalidProfile(_) => (
                status,
                Json(serde_json::json!({ "error": self.to_string() })),
            )
                .into_response(),
            _ => (status, self.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_message() {
        let err = AuthError::MissingCredential;
        assert_eq!(err.to_string(), "Authorization Bearer token is required");
    }

    #[test]
    fn test_invalid_token_message() {
        let err = AuthError::InvalidToken("audience mismatch".to_string());
        assert_eq!(err.to_string(), "Invalid token: audience mismatch");
    }

    #[test]
    fn test_insufficient_scope_lists_required_scopes() {
        let err = AuthError::InsufficientScope(vec![
            "{path.tenantId}:read:users".to_string(),
            "admin:users".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Insufficient scope. Required scopes: {path.tenantId}:read:users admin:users"
        );
    }

    #[test]
    fn test_status_codes() {
        let unauthorized = [
            AuthError::MissingCredential,
            AuthError::MissingToken,
            AuthError::InvalidToken("expired".to_string()),
            AuthError::KeyResolutionFailure("timeout".to_string()),
            AuthError::TokenRevoked,
            AuthError::UpstreamAuthFailure(500),
            AuthError::IdentityUnavailable("connection refused".to_string()),
            AuthError::InvalidProfile("email is required".to_string()),
        ];
        for err in unauthorized {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{err}");
            assert_eq!(err.error_type(), "UnauthorizedError");
        }

        let forbidden = [
            AuthError::InsufficientScope(vec!["read:users".to_string()]),
            AuthError::DeniedRole("admin".to_string()),
        ];
        for err in forbidden {
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN, "{err}");
            assert_eq!(err.error_type(), "ForbiddenError");
        }
    }

    #[test]
    fn test_unauthorized_response() {
        let response = AuthError::TokenRevoked.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_response() {
        let response = AuthError::DeniedRole("admin".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_profile_response_has_json_diagnostic() {
        let response =
            AuthError::InvalidProfile("email is not a valid email address.".to_string())
                .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json["error"],
            "User profile is invalid: email is not a valid email address."
        );
    }
}
