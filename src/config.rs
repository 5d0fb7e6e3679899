//! Configuration parsing
//!
//! Authorization settings and the static route/handler table can be loaded
//! from a TOML file.
//!
//! # Example
//!
//! ```rust,ignore
//! use route_authz::config::load_config;
//!
//! let config = load_config("auth.toml")?;
//! let authorizer = route_authz::Authorizer::builder(config.auth).build()?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::route::{HandlerSpec, RouteSpec};
use crate::{Error, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceAuthConfig {
    /// Authorization service settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Request routes
    #[serde(default)]
    pub routes: Vec<RouteSpec>,

    /// Message handlers
    #[serde(default)]
    pub handlers: Vec<HandlerSpec>,
}

impl ServiceAuthConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_config(path)
    }
}

/// Authorization service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the identity service
    #[serde(default, alias = "authUrl")]
    pub auth_url: Option<String>,

    /// Tenant or organization partitioning the signing keys
    #[serde(default, alias = "organization")]
    pub tenant: Option<String>,

    /// Expected token audience
    #[serde(default)]
    pub audience: Option<String>,

    /// Expected token issuer
    #[serde(default)]
    pub issuer: Option<String>,

    /// Use the tenant-less `<authUrl>/auth/me` profile endpoint
    #[serde(default)]
    pub legacy_profile_endpoint: bool,

    #[serde(default)]
    pub jwks: JwksConfig,
}

impl AuthConfig {
    pub fn new(auth_url: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            auth_url: Some(auth_url.into()),
            tenant: Some(tenant.into()),
            ..Self::default()
        }
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    fn base_url(&self) -> Option<&str> {
        self.auth_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }

    /// `<authUrl>/auth/<tenant>/.well-known/jwks.json`
    pub fn jwks_uri(&self) -> Option<String> {
        let tenant = self.tenant.as_deref()?;
        Some(format!("{}/auth/{}/.well-known/jwks.json", self.base_url()?, tenant))
    }

    /// `<authUrl>/auth/<tenant>/me`, or `<authUrl>/auth/me` in the legacy form
    pub fn profile_url(&self) -> Option<String> {
        let base = self.base_url()?;
        match (self.legacy_profile_endpoint, self.tenant.as_deref()) {
            (false, Some(tenant)) => Some(format!("{}/auth/{}/me", base, tenant)),
            _ => Some(format!("{}/auth/me", base)),
        }
    }
}

/// Signing key fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: usize,
}

impl JwksConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for JwksConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    36000
}

fn default_requests_per_minute() -> usize {
    10
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceAuthConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

    toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse TOML config: {}", e)))
}
