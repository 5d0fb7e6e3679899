//! Resource scope authorization
//!
//! Required scopes may embed `{path.<name>}` or `{query.<name>}` placeholders,
//! e.g. `{path.tenantId}:read:users`. Placeholders are filled from the request
//! parameters before comparison; unresolvable placeholders become empty.
//! Access is granted when any expanded scope appears in the token's `scope`.

use regex::Regex;
use std::sync::OnceLock;

use super::claims::Claims;
use super::error::AuthError;
use crate::route::RequestParams;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("valid placeholder pattern"))
}

/// Substitute every placeholder in a scope template
pub fn expand_scope(template: &str, params: &RequestParams) -> String {
    placeholder()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            params.lookup(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned()
}

pub fn expand_scopes(templates: &[String], params: &RequestParams) -> Vec<String> {
    templates
        .iter()
        .map(|template| expand_scope(template, params))
        .collect()
}

/// Check the token's granted scopes against the required scope templates
pub fn authorize_scopes(
    claims: &Claims,
    required: &[String],
    params: &RequestParams,
) -> Result<(), AuthError> {
    if required.is_empty() {
        return Ok(());
    }

    let insufficient = || AuthError::InsufficientScope(required.to_vec());

    if claims.scope().is_none() {
        tracing::debug!("Token carries no string scope claim");
        return Err(insufficient());
    }

    let granted = claims.granted_scopes();
    let expanded = expand_scopes(required, params);
    if expanded.iter().any(|scope| granted.contains(scope.as_str())) {
        Ok(())
    } else {
        tracing::debug!(?expanded, "No required scope granted");
        Err(insufficient())
    }
}
