//! Chain composition and evaluation
//!
//! Each registered spec gets an immutable [`Chain`] built once at registration:
//!
//! - a non-empty `scope` adds the scope gate: verify token, then check scopes
//! - a non-public `access_level` adds the role gate: resolve identity, then
//!   check role
//!
//! The scope gate always runs first. The first failing check ends evaluation.
//! Request routes and message handlers run the same chains through
//! [`Authorizer::run`].

use axum::http::StatusCode;
use std::sync::Arc;

use crate::auth::claims::Claims;
use crate::auth::error::AuthError;
use crate::auth::roles::{is_authorized, is_public};
use crate::auth::scope::authorize_scopes;
use crate::config::AuthConfig;
use crate::credential::Credentials;
use crate::identity::{HttpIdentityResolver, Identity, IdentityResolver};
use crate::route::{RequestParams, RouteSpec};
use crate::token::{
    JwksClient, KeySource, RevocationCheck, SecretProvider, SigningKeyStore, TokenVerifier, VerifyOptions,
};
use crate::{Error, Result};

/// The two independent authorization paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Resource scopes carried by a verified token
    Scope,
    /// Legacy role hierarchy from the identity service profile
    Role,
}

/// A single step of a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    VerifyToken,
    AuthorizeScope(Vec<String>),
    ResolveIdentity,
    AuthorizeRole(String),
}

impl Check {
    pub fn gate(&self) -> Gate {
        match self {
            Check::VerifyToken | Check::AuthorizeScope(_) => Gate::Scope,
            Check::ResolveIdentity | Check::AuthorizeRole(_) => Gate::Role,
        }
    }
}

/// Ordered, immutable sequence of checks for one route or handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    checks: Arc<[Check]>,
    credentials_required: bool,
}

impl Chain {
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// True for unauthenticated routes and handlers
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn credentials_required(&self) -> bool {
        self.credentials_required
    }

    pub fn has_gate(&self, gate: Gate) -> bool {
        self.checks.iter().any(|check| check.gate() == gate)
    }
}

/// Build the chain for a spec
pub fn build_chain(spec: &RouteSpec) -> Chain {
    let mut checks = Vec::new();

    if !spec.scope.is_empty() {
        checks.push(Check::VerifyToken);
        checks.push(Check::AuthorizeScope(spec.scope.clone()));
    }

    if let Some(access_level) = spec.access_level.as_deref().filter(|level| !is_public(Some(level))) {
        checks.push(Check::ResolveIdentity);
        checks.push(Check::AuthorizeRole(access_level.to_string()));
    }

    Chain {
        checks: checks.into(),
        credentials_required: spec.credentials_required,
    }
}

/// Result of evaluating a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Allowed,
    DeniedRole(String),
    DeniedScope(Vec<String>),
    AuthenticationFailed(AuthError),
}

impl AuthorizationOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationOutcome::Allowed)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthorizationOutcome::Allowed => StatusCode::OK,
            AuthorizationOutcome::DeniedRole(_) | AuthorizationOutcome::DeniedScope(_) => StatusCode::FORBIDDEN,
            AuthorizationOutcome::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<std::result::Result<(), AuthError>> for AuthorizationOutcome {
    fn from(result: std::result::Result<(), AuthError>) -> Self {
        match result {
            Ok(()) => AuthorizationOutcome::Allowed,
            Err(AuthError::DeniedRole(level)) => AuthorizationOutcome::DeniedRole(level),
            Err(AuthError::InsufficientScope(scopes)) => AuthorizationOutcome::DeniedScope(scopes),
            Err(err) => AuthorizationOutcome::AuthenticationFailed(err),
        }
    }
}

/// Per-request or per-message authorization state
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub credentials: Credentials,
    pub params: RequestParams,
    /// Claims of the verified token, set by the scope gate
    pub claims: Option<Claims>,
    /// Resolved identity, set by the role gate or seeded by the caller
    pub identity: Option<Identity>,
}

impl AuthContext {
    pub fn new(credentials: Credentials, params: RequestParams) -> Self {
        Self {
            credentials,
            params,
            claims: None,
            identity: None,
        }
    }

    /// Reuse an identity already resolved earlier in the cycle
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }
}

/// A registered spec with its chain
#[derive(Debug, Clone)]
pub struct GuardedEndpoint {
    spec: Arc<RouteSpec>,
    chain: Chain,
}

impl GuardedEndpoint {
    pub fn spec(&self) -> &RouteSpec {
        &self.spec
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }
}

struct AuthorizerInner {
    verifier: TokenVerifier,
    identity: Option<Arc<dyn IdentityResolver>>,
}

/// Evaluates chains against requests and messages
#[derive(Clone)]
pub struct Authorizer {
    inner: Arc<AuthorizerInner>,
}

impl Authorizer {
    pub fn builder(config: AuthConfig) -> AuthorizerBuilder {
        AuthorizerBuilder::new(config)
    }

    /// Register a route or handler spec and build its chain.
    ///
    /// Fails when the spec needs identity resolution but neither an
    /// `auth_url` nor a custom identity resolver was configured.
    pub fn register(&self, spec: RouteSpec) -> Result<GuardedEndpoint> {
        let chain = build_chain(&spec);

        if chain.has_gate(Gate::Role) {
            if self.inner.identity.is_none() {
                return Err(Error::Config(format!(
                    "`auth_url` or a custom identity resolver is required for access level routes ({})",
                    spec.name
                )));
            }
            tracing::warn!(
                "Access level authorization on {} is deprecated, declare resource scopes instead",
                spec.name
            );
        }

        tracing::info!(endpoint = %spec.name, checks = chain.checks().len(), "Registered authorization chain");

        Ok(GuardedEndpoint {
            spec: Arc::new(spec),
            chain,
        })
    }

    /// Run a chain, stopping at the first failing check
    pub async fn run(&self, chain: &Chain, ctx: &mut AuthContext) -> std::result::Result<(), AuthError> {
        let mut anonymous = false;

        for check in chain.checks() {
            tracing::debug!(?check, "Running authorization check");

            match check {
                Check::VerifyToken => {
                    let Some(token) = ctx.credentials.token.as_deref() else {
                        if chain.credentials_required() {
                            return Err(AuthError::MissingToken);
                        }
                        anonymous = true;
                        continue;
                    };
                    ctx.claims = Some(self.inner.verifier.verify(token).await?);
                }
                Check::AuthorizeScope(scopes) => {
                    if anonymous {
                        continue;
                    }
                    let claims = ctx
                        .claims
                        .as_ref()
                        .ok_or_else(|| AuthError::InsufficientScope(scopes.clone()))?;
                    authorize_scopes(claims, scopes, &ctx.params)?;
                }
                Check::ResolveIdentity => {
                    if ctx.identity.is_some() {
                        continue;
                    }
                    if ctx.credentials.token().is_none() {
                        return Err(AuthError::MissingCredential);
                    }
                    let resolver = self.inner.identity.as_ref().ok_or_else(|| {
                        AuthError::IdentityUnavailable("No identity resolver configured".to_string())
                    })?;
                    ctx.identity = Some(resolver.resolve(&ctx.credentials).await?);
                }
                Check::AuthorizeRole(access_level) => {
                    if !is_authorized(ctx.identity.as_ref(), Some(access_level)) {
                        return Err(AuthError::DeniedRole(access_level.clone()));
                    }
                }
            }
        }

        Ok(())
    }

    /// Run a chain and report a tagged outcome
    pub async fn authorize(&self, endpoint: &GuardedEndpoint, ctx: &mut AuthContext) -> AuthorizationOutcome {
        let result = self.run(endpoint.chain(), ctx).await;
        if let Err(err) = &result {
            tracing::warn!(endpoint = %endpoint.spec().name, "Authorization failed: {}", err);
        }
        result.into()
    }
}

/// Builder for [`Authorizer`], carrying the override hooks
pub struct AuthorizerBuilder {
    config: AuthConfig,
    secret_provider: Option<Arc<dyn SecretProvider>>,
    key_store: Option<Arc<dyn SigningKeyStore>>,
    revocation: Option<Arc<dyn RevocationCheck>>,
    identity_resolver: Option<Arc<dyn IdentityResolver>>,
}

impl AuthorizerBuilder {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            secret_provider: None,
            key_store: None,
            revocation: None,
            identity_resolver: None,
        }
    }

    /// Resolve verification keys with a custom provider instead of the JWKS endpoint
    pub fn secret_provider(mut self, provider: Arc<dyn SecretProvider>) -> Self {
        self.secret_provider = Some(provider);
        self
    }

    /// Look up RS256 keys through a custom store instead of the JWKS endpoint
    pub fn signing_key_store(mut self, store: Arc<dyn SigningKeyStore>) -> Self {
        self.key_store = Some(store);
        self
    }

    pub fn revocation_check(mut self, revocation: Arc<dyn RevocationCheck>) -> Self {
        self.revocation = Some(revocation);
        self
    }

    /// Resolve identities with a custom resolver instead of the profile endpoint
    pub fn identity_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.identity_resolver = Some(resolver);
        self
    }

    fn key_source(&self) -> Result<KeySource> {
        if let Some(provider) = &self.secret_provider {
            return Ok(KeySource::Custom(provider.clone()));
        }
        if let Some(store) = &self.key_store {
            return Ok(KeySource::SigningKeys(store.clone()));
        }
        if self.config.auth_url.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Config("`auth_url` is required".to_string()));
        }
        let jwks_uri = self
            .config
            .jwks_uri()
            .ok_or_else(|| Error::Config("`tenant` is required".to_string()))?;

        let client = JwksClient::new(jwks_uri)
            .with_cache_duration(self.config.jwks.cache_ttl())
            .with_requests_per_minute(self.config.jwks.requests_per_minute);
        Ok(KeySource::SigningKeys(Arc::new(client)))
    }

    pub fn build(self) -> Result<Authorizer> {
        let options = VerifyOptions {
            audience: self.config.audience.clone(),
            issuer: self.config.issuer.clone(),
        };
        let mut verifier = TokenVerifier::new(self.key_source()?, options);
        if let Some(revocation) = self.revocation.clone() {
            verifier = verifier.with_revocation_check(revocation);
        }

        let identity = self.identity_resolver.clone().or_else(|| {
            self.config
                .profile_url()
                .map(|url| Arc::new(HttpIdentityResolver::new(url)) as Arc<dyn IdentityResolver>)
        });

        Ok(Authorizer {
            inner: Arc::new(AuthorizerInner { verifier, identity }),
        })
    }
}
