//! Authorization building blocks
//!
//! - [`Claims`] with scope helpers
//! - the role model and legacy access levels
//! - scope template expansion and matching
//! - [`AuthorizeLayer`] and [`UserInfoLayer`] middleware
//!
//! # Example
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use route_authz::{AuthConfig, Authorizer, RouteSpec};
//!
//! let authorizer = Authorizer::builder(AuthConfig::new("https://auth.example.com", "ls")).build()?;
//!
//! let app = Router::new()
//!     .route("/admin", get(admin_handler))
//!     .route_layer(authorizer.layer(RouteSpec::new("/admin").access_level("admin"))?);
//! ```

pub mod claims;
pub mod error;
pub mod middleware;
pub mod roles;
pub mod scope;

pub use claims::{Audience, Claims};
pub use error::AuthError;
pub use middleware::{AuthorizeLayer, AuthorizeMiddleware, UserInfoLayer, UserInfoMiddleware};
pub use roles::{AccessLevel, Role};
