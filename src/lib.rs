//! # route-authz
//!
//! Authorization for request routes and message handlers.
//!
//! Each registered route or handler gets an ordered chain of checks:
//!
//! - the **scope gate** verifies a bearer JWT (RS256 through the tenant's
//!   JWKS endpoint, or a custom secret) and requires at least one of the
//!   declared scopes, with `{path.x}`/`{query.x}` placeholders expanded from
//!   the request
//! - the **role gate** resolves the caller's profile from the identity
//!   service and compares its role against a legacy access level
//!
//! The scope gate always runs first. Chains are attached to axum routes with
//! [`AuthorizeLayer`] and to message handlers through [`MessageGuard`].
//!
//! ```rust,ignore
//! use route_authz::{AuthConfig, Authorizer, RouteSpec};
//!
//! let authorizer = Authorizer::builder(
//!     AuthConfig::new("https://auth.example.com", "ls").audience("https://api.example.com"),
//! )
//! .build()?;
//!
//! let app = Router::new().route(
//!     "/books",
//!     get(list_books).route_layer(authorizer.layer(RouteSpec::new("/books").scope(["read:books"]))?),
//! );
//! ```

pub mod auth;
pub mod authorizer;
pub mod axum_integration;
pub mod config;
pub mod credential;
pub mod error;
pub mod identity;
pub mod message;
pub mod route;
pub mod token;

pub use error::{Error, Result};

pub use auth::{AuthError, AuthorizeLayer, Claims, UserInfoLayer};
pub use authorizer::{AuthContext, AuthorizationOutcome, Authorizer, AuthorizerBuilder, GuardedEndpoint};
pub use axum_integration::{AuthenticatedUser, UserInfo, VerifiedClaims};
pub use config::{load_config, AuthConfig, ServiceAuthConfig};
pub use credential::Credentials;
pub use identity::{HttpIdentityResolver, Identity, IdentityResolver};
pub use message::{Connection, MessageError, MessageGuard};
pub use route::{HandlerSpec, ParamLocation, ParamSpec, RequestParams, RouteSpec};
pub use token::{JwksClient, RevocationCheck, SecretProvider, SigningKeyStore};
