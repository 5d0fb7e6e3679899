use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Audience claim, either a single value or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == audience,
            Audience::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }
}

/// Decoded token payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// Expiration time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Not before
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    /// Issued at time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Remaining claims, including `scope`
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Claims {
    /// The raw `scope` claim, if present and a string
    pub fn scope(&self) -> Option<&str> {
        match self.extra.get("scope") {
            Some(Value::String(scope)) => Some(scope),
            _ => None,
        }
    }

    /// Granted scope tokens (empty when `scope` is missing or not a string)
    pub fn granted_scopes(&self) -> HashSet<&str> {
        self.scope()
            .map(|scope| scope.split(' ').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.granted_scopes().contains(scope)
    }

    /// Check if claims contain any of the provided scopes
    pub fn has_any_scope(&self, scopes: &[&str]) -> bool {
        let granted = self.granted_scopes();
        scopes.iter().any(|scope| granted.contains(scope))
    }
}
