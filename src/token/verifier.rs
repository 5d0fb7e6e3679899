//! Bearer token verification

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use std::sync::Arc;

use super::jwks::SigningKeyStore;
use crate::auth::claims::Claims;
use crate::auth::error::AuthError;

/// Key material and algorithm supplied by a custom secret provider
#[derive(Clone)]
pub struct ResolvedSecret {
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

impl ResolvedSecret {
    /// Shared HMAC secret
    pub fn hmac(secret: &[u8], algorithm: Algorithm) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            algorithm,
        }
    }
}

/// Custom key resolution, replacing the signing key store when configured
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn resolve_secret(&self, header: &Header) -> anyhow::Result<ResolvedSecret>;
}

/// Revocation check run on verified claims
#[async_trait]
pub trait RevocationCheck: Send + Sync {
    async fn is_revoked(&self, claims: &Claims) -> anyhow::Result<bool>;
}

/// Where verification keys come from
#[derive(Clone)]
pub enum KeySource {
    /// RS256 keys looked up by `kid`
    SigningKeys(Arc<dyn SigningKeyStore>),
    /// Caller-supplied resolution for any algorithm
    Custom(Arc<dyn SecretProvider>),
}

/// Expected audience and issuer
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Must appear in the token's audience claim
    pub audience: Option<String>,
    /// Must equal the token's issuer claim
    pub issuer: Option<String>,
}

/// Verifies signature, expiry, not-before, audience and issuer of bearer tokens
#[derive(Clone)]
pub struct TokenVerifier {
    key_source: KeySource,
    options: VerifyOptions,
    revocation: Option<Arc<dyn RevocationCheck>>,
}

impl TokenVerifier {
    pub fn new(key_source: KeySource, options: VerifyOptions) -> Self {
        Self {
            key_source,
            options,
            revocation: None,
        }
    }

    pub fn with_revocation_check(mut self, revocation: Arc<dyn RevocationCheck>) -> Self {
        self.revocation = Some(revocation);
        self
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    async fn resolve_key(&self, header: &Header) -> Result<(DecodingKey, Algorithm), AuthError> {
        match &self.key_source {
            KeySource::Custom(provider) => {
                let secret = provider
                    .resolve_secret(header)
                    .await
                    .map_err(|e| AuthError::KeyResolutionFailure(e.to_string()))?;
                Ok((secret.key, secret.algorithm))
            }
            KeySource::SigningKeys(store) => {
                if header.alg != Algorithm::RS256 {
                    return Err(AuthError::InvalidToken(format!(
                        "Unsupported algorithm {:?}, only RS256 is accepted",
                        header.alg
                    )));
                }
                let kid = header
                    .kid
                    .as_deref()
                    .ok_or_else(|| AuthError::InvalidToken("JWT missing kid in header".to_string()))?;
                let key = store.get_signing_key(kid).await?;
                Ok((key, Algorithm::RS256))
            }
        }
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        // No clock skew allowance, and `exp` is optional
        validation.leeway = 0;
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_nbf = true;

        match &self.options.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &self.options.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }

    /// Verify a token and return its claims
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("Invalid JWT header: {}", e)))?;

        let (key, algorithm) = self.resolve_key(&header).await?;

        tracing::debug!("Validating JWT with kid: {:?}, algorithm: {:?}", header.kid, algorithm);

        let claims = decode::<Claims>(token, &key, &self.validation(algorithm))
            .map_err(|e| AuthError::InvalidToken(describe(e.kind())))?
            .claims;

        if let Some(revocation) = &self.revocation {
            let revoked = revocation
                .is_revoked(&claims)
                .await
                .map_err(|e| AuthError::InvalidToken(format!("Revocation check failed: {}", e)))?;
            if revoked {
                tracing::warn!("Rejected revoked token for subject: {:?}", claims.sub);
                return Err(AuthError::TokenRevoked);
            }
        }

        Ok(claims)
    }
}

fn describe(kind: &ErrorKind) -> String {
    match kind {
        ErrorKind::ExpiredSignature => "jwt expired".to_string(),
        ErrorKind::ImmatureSignature => "jwt not active".to_string(),
        ErrorKind::InvalidAudience => "jwt audience invalid".to_string(),
        ErrorKind::InvalidIssuer => "jwt issuer invalid".to_string(),
        ErrorKind::InvalidSignature => "invalid signature".to_string(),
        ErrorKind::InvalidAlgorithm => "invalid algorithm".to_string(),
        ErrorKind::MissingRequiredClaim(claim) => format!("jwt missing required claim: {}", claim),
        other => format!("{:?}", other),
    }
}
