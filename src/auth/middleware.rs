use axum::extract::{FromRequestParts, RawPathParams, Request};
use axum::response::{IntoResponse, Response};
use http::{header, Method};
use std::sync::Arc;
use tower::Layer;
use tower::Service;

use crate::authorizer::{AuthContext, Authorizer, GuardedEndpoint};
use crate::axum_integration::UserInfo;
use crate::credential::Credentials;
use crate::identity::{HttpIdentityResolver, Identity};
use crate::route::{query_pairs, RequestParams, RouteSpec};

type BoxFuture<T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send>>;

/// CORS preflight requests carry no credentials and are never authorized
fn is_cors_preflight(request: &Request) -> bool {
    request.method() == Method::OPTIONS
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

/// Middleware layer that runs a route's authorization chain
///
/// On success the verified [`Claims`](crate::auth::Claims) and resolved
/// [`Identity`] are inserted into the request extensions. On failure the
/// request is answered with the [`AuthError`](crate::auth::AuthError) response.
#[derive(Clone)]
pub struct AuthorizeLayer {
    authorizer: Authorizer,
    endpoint: Arc<GuardedEndpoint>,
}

impl AuthorizeLayer {
    pub fn new(authorizer: Authorizer, endpoint: GuardedEndpoint) -> Self {
        Self {
            authorizer,
            endpoint: Arc::new(endpoint),
        }
    }

    pub fn endpoint(&self) -> &GuardedEndpoint {
        &self.endpoint
    }
}

impl Authorizer {
    /// Register a route spec and return a layer enforcing it
    ///
    /// ```rust,ignore
    /// let app = Router::new().route(
    ///     "/tenants/{tenantId}/users",
    ///     get(list_users).route_layer(authorizer.layer(
    ///         RouteSpec::new("/tenants/{tenantId}/users")
    ///             .scope(["{path.tenantId}:read:users"])
    ///             .path_param("tenantId"),
    ///     )?),
    /// );
    /// ```
    pub fn layer(&self, spec: RouteSpec) -> crate::Result<AuthorizeLayer> {
        Ok(AuthorizeLayer::new(self.clone(), self.register(spec)?))
    }
}

impl<S> Layer<S> for AuthorizeLayer {
    type Service = AuthorizeMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizeMiddleware {
            inner,
            authorizer: self.authorizer.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthorizeMiddleware<S> {
    inner: S,
    authorizer: Authorizer,
    endpoint: Arc<GuardedEndpoint>,
}

impl<S> Service<Request> for AuthorizeMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let authorizer = self.authorizer.clone();
        let endpoint = self.endpoint.clone();

        Box::pin(async move {
            if endpoint.chain().is_empty() || is_cors_preflight(&request) {
                return inner.call(request).await;
            }

            let (mut parts, body) = request.into_parts();

            let raw_params = RawPathParams::from_request_parts(&mut parts, &()).await.ok();
            let params = RequestParams::collect(
                &endpoint.spec().parameters,
                raw_params.iter().flat_map(|raw| raw.iter()),
                query_pairs(&parts.uri),
            );

            let mut ctx = AuthContext::new(Credentials::from_headers(&parts.headers), params);
            ctx.identity = parts.extensions.get::<Identity>().cloned();

            if let Err(err) = authorizer.run(endpoint.chain(), &mut ctx).await {
                tracing::warn!(endpoint = %endpoint.spec().name, "Request authorization failed: {}", err);
                return Ok(err.into_response());
            }

            if let Some(claims) = ctx.claims {
                parts.extensions.insert(claims);
            }
            if let Some(identity) = ctx.identity {
                parts.extensions.insert(identity);
            }

            inner.call(Request::from_parts(parts, body)).await
        })
    }
}

/// Middleware layer that attaches the caller's profile as [`UserInfo`]
///
/// Requests without a bearer token pass through untouched.
#[derive(Clone)]
pub struct UserInfoLayer {
    resolver: Arc<HttpIdentityResolver>,
}

impl UserInfoLayer {
    pub fn new(resolver: HttpIdentityResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}

impl<S> Layer<S> for UserInfoLayer {
    type Service = UserInfoMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UserInfoMiddleware {
            inner,
            resolver: self.resolver.clone(),
        }
    }
}

#[derive(Clone)]
pub struct UserInfoMiddleware<S> {
    inner: S,
    resolver: Arc<HttpIdentityResolver>,
}

impl<S> Service<Request> for UserInfoMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let resolver = self.resolver.clone();

        Box::pin(async move {
            let credentials = Credentials::from_headers(request.headers());
            if credentials.token().is_none() {
                return inner.call(request).await;
            }

            match resolver.fetch_profile(&credentials).await {
                Ok(profile) => {
                    request.extensions_mut().insert(UserInfo(profile));
                    inner.call(request).await
                }
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}
