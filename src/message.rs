//! Authorization for message handlers
//!
//! Message handlers run the same chains as request routes. Credentials come
//! from the `token`/`authToken` payload fields and declared parameters from
//! top-level payload fields. A failed chain emits [`UNAUTHORIZED_EVENT`] on
//! the originating connection and yields a [`MessageError`] for the
//! message's callback.
//!
//! ```rust,ignore
//! let mut guard = MessageGuard::new(authorizer);
//! guard.register(HandlerSpec::new("books:list").scope(["read:books"]))?;
//!
//! match guard.authorize("books:list", &connection, &payload).await {
//!     Ok(ctx) => list_books(ctx, payload).await,
//!     Err(err) => ack(serde_json::to_value(err)?),
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::auth::error::AuthError;
use crate::authorizer::{AuthContext, Authorizer, GuardedEndpoint};
use crate::credential::Credentials;
use crate::identity::Identity;
use crate::route::{HandlerSpec, RequestParams};
use crate::{Error, Result};

/// Event emitted to a connection whose message failed authorization
pub const UNAUTHORIZED_EVENT: &str = "unauthorized";

/// The originating side of a message exchange
pub trait Connection: Send + Sync {
    fn emit(&self, event: &str);
}

/// Error object delivered through a message's callback channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageError {
    pub code: u16,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

impl From<&AuthError> for MessageError {
    fn from(err: &AuthError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            message: err.to_string(),
            error_type: err.error_type().to_string(),
        }
    }
}

impl From<AuthError> for MessageError {
    fn from(err: AuthError) -> Self {
        Self::from(&err)
    }
}

/// Registered message handlers and their chains
#[derive(Clone)]
pub struct MessageGuard {
    authorizer: Authorizer,
    handlers: HashMap<String, GuardedEndpoint>,
}

impl MessageGuard {
    pub fn new(authorizer: Authorizer) -> Self {
        Self {
            authorizer,
            handlers: HashMap::new(),
        }
    }

    /// Register every handler of a static table
    pub fn with_handlers(authorizer: Authorizer, handlers: impl IntoIterator<Item = HandlerSpec>) -> Result<Self> {
        let mut guard = Self::new(authorizer);
        for spec in handlers {
            guard.register(spec)?;
        }
        Ok(guard)
    }

    /// Register a handler spec under its event name
    pub fn register(&mut self, spec: HandlerSpec) -> Result<()> {
        if self.handlers.contains_key(&spec.name) {
            return Err(Error::DuplicateHandler(spec.name));
        }
        let endpoint = self.authorizer.register(spec)?;
        self.handlers.insert(endpoint.spec().name.clone(), endpoint);
        Ok(())
    }

    pub fn handler(&self, event: &str) -> Option<&GuardedEndpoint> {
        self.handlers.get(event)
    }

    /// Authorize one inbound message
    pub async fn authorize(
        &self,
        event: &str,
        connection: &dyn Connection,
        payload: &Value,
    ) -> std::result::Result<AuthContext, MessageError> {
        self.authorize_with_identity(event, connection, payload, None).await
    }

    /// Authorize one inbound message for a connection that already carries
    /// an identity from an earlier cycle
    pub async fn authorize_with_identity(
        &self,
        event: &str,
        connection: &dyn Connection,
        payload: &Value,
        identity: Option<Identity>,
    ) -> std::result::Result<AuthContext, MessageError> {
        let credentials = Credentials::from_message(payload);

        let Some(endpoint) = self.handlers.get(event) else {
            tracing::debug!(event, "No authorization chain registered for event");
            return Ok(AuthContext::new(credentials, RequestParams::default()));
        };

        let params = RequestParams::from_payload(&endpoint.spec().parameters, payload);
        let mut ctx = AuthContext::new(credentials, params);
        ctx.identity = identity;

        match self.authorizer.run(endpoint.chain(), &mut ctx).await {
            Ok(()) => Ok(ctx),
            Err(err) => {
                tracing::warn!(event, "Message authorization failed: {}", err);
                connection.emit(UNAUTHORIZED_EVENT);
                Err(MessageError::from(err))
            }
        }
    }
}
