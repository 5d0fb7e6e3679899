//! Route and message handler definitions
//!
//! A [`RouteSpec`] is the static, read-only description of what a route or
//! message handler requires. Specs are registered once and never mutated.

use axum::extract::Query;
use http::Uri;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Where a declared parameter is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
}

/// A named parameter declared by a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParamLocation,
}

/// Authorization requirements of a request route or message handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Route path or message event name, used for logging and handler lookup
    pub name: String,

    /// Legacy role-based access level (`public`, `user`, `staff`, `admin`)
    #[serde(default, alias = "accessLevel")]
    pub access_level: Option<String>,

    /// Resource scopes, any one of which grants access
    #[serde(default)]
    pub scope: Vec<String>,

    /// Parameters available for dynamic scope expansion, in declaration order
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,

    /// When false, requests without a token skip the scope gate
    #[serde(default = "default_credentials_required", alias = "credentialsRequired")]
    pub credentials_required: bool,
}

/// Message handlers share the route shape
pub type HandlerSpec = RouteSpec;

fn default_credentials_required() -> bool {
    true
}

impl RouteSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access_level: None,
            scope: Vec::new(),
            parameters: Vec::new(),
            credentials_required: true,
        }
    }

    pub fn access_level(mut self, access_level: impl Into<String>) -> Self {
        self.access_level = Some(access_level.into());
        self
    }

    pub fn scope<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn path_param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(ParamSpec {
            name: name.into(),
            location: ParamLocation::Path,
        });
        self
    }

    pub fn query_param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(ParamSpec {
            name: name.into(),
            location: ParamLocation::Query,
        });
        self
    }

    pub fn credentials_optional(mut self) -> Self {
        self.credentials_required = false;
        self
    }
}

/// Resolved path and query parameter values for one request or message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    pub path: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

impl RequestParams {
    /// Collect the declared parameters from raw path captures and decoded
    /// query pairs (see [`query_pairs`]).
    ///
    /// Path values are percent-decoded. Undeclared captures and query keys are dropped.
    pub fn collect<'a>(
        declared: &[ParamSpec],
        path_captures: impl IntoIterator<Item = (&'a str, &'a str)>,
        query_pairs: Vec<(String, String)>,
    ) -> Self {
        let captures: HashMap<&str, &str> = path_captures.into_iter().collect();

        let mut params = Self::default();
        for param in declared {
            match param.location {
                ParamLocation::Path => {
                    if let Some(value) = captures.get(param.name.as_str()) {
                        params.path.insert(param.name.clone(), decode(value));
                    }
                }
                ParamLocation::Query => {
                    if let Some((_, value)) = query_pairs.iter().find(|(k, _)| *k == param.name) {
                        params.query.insert(param.name.clone(), value.clone());
                    }
                }
            }
        }
        params
    }

    /// Collect the declared parameters from top-level message payload fields.
    ///
    /// String and number fields are accepted; other types are ignored.
    pub fn from_payload(declared: &[ParamSpec], payload: &Value) -> Self {
        let mut params = Self::default();
        for param in declared {
            let value = match payload.get(&param.name) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => continue,
            };
            let target = match param.location {
                ParamLocation::Path => &mut params.path,
                ParamLocation::Query => &mut params.query,
            };
            target.insert(param.name.clone(), value);
        }
        params
    }

    /// Look up a placeholder key of the form `path.<name>` or `query.<name>`
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let (location, name) = key.split_once('.')?;
        let values = match location {
            "path" => &self.path,
            "query" => &self.query,
            _ => return None,
        };
        values.get(name).map(String::as_str)
    }
}

fn decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Decoded `key=value` pairs of a URI's query string.
///
/// A malformed query yields no pairs.
pub fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(pairs)) => pairs,
        Err(err) => {
            tracing::debug!("Ignoring malformed query string: {}", err);
            Vec::new()
        }
    }
}
