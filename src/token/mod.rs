//! Bearer token verification
//!
//! RS256 tokens are verified against keys looked up by `kid` through a
//! [`SigningKeyStore`], by default the cached, rate-limited [`JwksClient`].
//! A custom [`SecretProvider`] replaces the key store when configured.

pub mod jwks;
pub mod verifier;

pub use jwks::{JwksClient, SigningKeyStore};
pub use verifier::{KeySource, ResolvedSecret, RevocationCheck, SecretProvider, TokenVerifier, VerifyOptions};
