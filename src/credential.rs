//! Bearer credential extraction
//!
//! Requests: `Authorization: Bearer <token>` > `auth-token` header > `authToken`
//! cookie. Refresh credential: `refresh-token` header > `refreshToken` cookie.
//!
//! Messages: `token` > `authToken` payload field, refresh from `refreshToken`.

use axum::http::{header, HeaderMap};
use serde_json::Value;

pub const AUTH_TOKEN_HEADER: &str = "auth-token";
pub const REFRESH_TOKEN_HEADER: &str = "refresh-token";
pub const AUTH_TOKEN_COOKIE: &str = "authToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Credentials carried by one request or message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: non_empty(Some(token.into())),
            refresh_token: None,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let token = extract_bearer_token(headers)
            .or_else(|| header_value(headers, AUTH_TOKEN_HEADER))
            .or_else(|| read_cookie(headers, AUTH_TOKEN_COOKIE));
        let refresh_token = header_value(headers, REFRESH_TOKEN_HEADER)
            .or_else(|| read_cookie(headers, REFRESH_TOKEN_COOKIE));

        Self { token, refresh_token }
    }

    pub fn from_message(payload: &Value) -> Self {
        let field = |name: &str| non_empty(payload.get(name).and_then(Value::as_str).map(str::to_string));

        Self {
            token: field("token").or_else(|| field("authToken")),
            refresh_token: field("refreshToken"),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively and the header must consist of
/// exactly the scheme and the credential.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split(' ');
    let (scheme, credential) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    non_empty(Some(credential.to_string()))
}

/// Read a cookie value from the `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| {
            let value = urlencoding::decode(value).map(|v| v.into_owned()).ok()?;
            non_empty(Some(value))
        })
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    non_empty(headers.get(name)?.to_str().ok().map(str::to_string))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        headers
    }

    #[test]
    fn test_extract_bearer_token_valid() {
        let headers = headers(&[("Authorization", "Bearer my-secret-token")]);
        assert_eq!(extract_bearer_token(&headers), Some("my-secret-token".to_string()));
    }

    #[test]
    fn test_extract_bearer_token_case_insensitive_scheme() {
        let headers = headers(&[("Authorization", "bEaReR my-secret-token")]);
        assert_eq!(extract_bearer_token(&headers), Some("my-secret-token".to_string()));
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let headers = headers(&[("Authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_extract_bearer_token_malformed() {
        assert_eq!(extract_bearer_token(&headers(&[("Authorization", "Bearertoken")])), None);
        assert_eq!(extract_bearer_token(&headers(&[("Authorization", "Bearer a b")])), None);
        assert_eq!(extract_bearer_token(&headers(&[("Authorization", "Bearer ")])), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_header_precedence() {
        let all = headers(&[
            ("Authorization", "Bearer from-bearer"),
            ("auth-token", "from-header"),
            ("Cookie", "authToken=from-cookie"),
        ]);
        assert_eq!(Credentials::from_headers(&all).token(), Some("from-bearer"));

        let no_bearer = headers(&[
            ("auth-token", "from-header"),
            ("Cookie", "authToken=from-cookie"),
        ]);
        assert_eq!(Credentials::from_headers(&no_bearer).token(), Some("from-header"));

        let cookie_only = headers(&[("Cookie", "theme=dark; authToken=from-cookie")]);
        assert_eq!(Credentials::from_headers(&cookie_only).token(), Some("from-cookie"));

        assert_eq!(Credentials::from_headers(&HeaderMap::new()), Credentials::default());
    }

    #[test]
    fn test_malformed_bearer_falls_through() {
        let headers = headers(&[("Authorization", "Basic abc"), ("auth-token", "from-header")]);
        assert_eq!(Credentials::from_headers(&headers).token(), Some("from-header"));
    }

    #[test]
    fn test_refresh_token_precedence() {
        let both = headers(&[
            ("refresh-token", "from-header"),
            ("Cookie", "refreshToken=from-cookie"),
        ]);
        assert_eq!(
            Credentials::from_headers(&both).refresh_token.as_deref(),
            Some("from-header")
        );

        let cookie = headers(&[("Cookie", "refreshToken=from-cookie")]);
        assert_eq!(
            Credentials::from_headers(&cookie).refresh_token.as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn test_read_cookie_across_headers() {
        let headers = headers(&[("Cookie", "a=1"), ("Cookie", "authToken=abc%3D")]);
        assert_eq!(read_cookie(&headers, "authToken"), Some("abc=".to_string()));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_from_message() {
        let creds = Credentials::from_message(&json!({"token": "t1", "authToken": "t2", "refreshToken": "r"}));
        assert_eq!(creds.token(), Some("t1"));
        assert_eq!(creds.refresh_token.as_deref(), Some("r"));

        let creds = Credentials::from_message(&json!({"authToken": "t2"}));
        assert_eq!(creds.token(), Some("t2"));

        let creds = Credentials::from_message(&json!({"token": "", "authToken": 5}));
        assert_eq!(creds, Credentials::default());
    }
}
