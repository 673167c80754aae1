//! The gate itself: a tower `Layer`/`Service` pair for axum routers.
//!
//! Responsibility:
//! - per-request orchestration: OPTIONS bypass → extract → verify →
//!   bind or dispatch
//! - exactly one of "identity bound, chain continues" or "error response
//!   written, chain halted" happens per request, never both, never neither

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use jsonwebtoken::Algorithm;
use tower::{Layer, Service};

use crate::config::{DEFAULT_IDENTITY_KEY, DEFAULT_LEEWAY_SECONDS, GateOptions};
use crate::context;
use crate::error::{DefaultErrorHandler, ErrorHandler, GateError};
use crate::extract::{BearerHeader, TokenExtractor};
use crate::verify::{self, KeyResolver};

/// Bearer-token authentication layer.
///
/// Configure with the fluent setters, then hand it to `Router::layer`:
///
/// ```no_run
/// use axum::{Router, routing::get};
/// use token_gate::{Algorithm, AuthGateLayer, DecodingKey, Identity, StaticKey};
///
/// async fn whoami(Identity(token): Identity) -> String {
///     token
///         .claim("sub")
///         .and_then(|v| v.as_str())
///         .unwrap_or("unknown")
///         .to_string()
/// }
///
/// let gate = AuthGateLayer::new(StaticKey(DecodingKey::from_secret(b"secret")))
///     .signing_method(Algorithm::HS256);
///
/// let app: Router = Router::new().route("/whoami", get(whoami)).layer(gate);
/// ```
#[derive(Clone)]
pub struct AuthGateLayer {
    resolver: Arc<dyn KeyResolver>,
    extractor: Arc<dyn TokenExtractor>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    identity_key: String,
    signing_method: Option<Algorithm>,
    credentials_optional: bool,
    auth_on_options: bool,
    debug: bool,
    leeway: u64,
}

impl AuthGateLayer {
    /// A gate with the default policy: mandatory credentials, `Authorization:
    /// Bearer` extraction, no algorithm constraint, 401 JSON responses.
    pub fn new(resolver: impl KeyResolver + 'static) -> Self {
        Self {
            resolver: Arc::new(resolver),
            extractor: Arc::new(BearerHeader::new()),
            error_handler: None,
            identity_key: DEFAULT_IDENTITY_KEY.to_string(),
            signing_method: None,
            credentials_optional: false,
            auth_on_options: false,
            debug: false,
            leeway: DEFAULT_LEEWAY_SECONDS,
        }
    }

    /// Require every accepted token to be signed with `method`.
    ///
    /// Strongly recommended whenever the key resolver is not itself
    /// algorithm-aware: the guard runs before the resolver, so a token cannot
    /// talk the gate into verifying with a key meant for another scheme.
    pub fn signing_method(mut self, method: Algorithm) -> Self {
        self.signing_method = Some(method);
        self
    }

    /// Let requests without any credential through, unauthenticated.
    ///
    /// A malformed credential still fails even with this set; leniency is
    /// only for absent ones.
    pub fn credentials_optional(mut self, optional: bool) -> Self {
        self.credentials_optional = optional;
        self
    }

    /// Extensions key the verified token is bound under.
    pub fn identity_key(mut self, key: impl Into<String>) -> Self {
        self.identity_key = key.into();
        self
    }

    /// Replace the token extraction strategy.
    pub fn extractor(mut self, extractor: impl TokenExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Replace the error responder.
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Also challenge OPTIONS requests.
    ///
    /// Off by default: CORS preflights carry no credentials and must not be
    /// answered with a 401.
    pub fn auth_on_options(mut self, enabled: bool) -> Self {
        self.auth_on_options = enabled;
        self
    }

    /// Include underlying error detail in default error responses.
    /// Do not leave this on in production.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Clock-skew tolerance for `exp` / `nbf`, in seconds.
    pub fn leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    fn options(&self) -> GateOptions {
        GateOptions {
            resolver: self.resolver.clone(),
            extractor: self.extractor.clone(),
            error_handler: self
                .error_handler
                .clone()
                .unwrap_or_else(|| Arc::new(DefaultErrorHandler { debug: self.debug })),
            identity_key: self.identity_key.clone(),
            signing_method: self.signing_method,
            credentials_optional: self.credentials_optional,
            auth_on_options: self.auth_on_options,
            leeway: self.leeway,
        }
    }
}

impl<S> Layer<S> for AuthGateLayer {
    type Service = AuthGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthGateService {
            inner,
            options: Arc::new(self.options()),
        }
    }
}

/// The per-route service produced by [`AuthGateLayer`].
#[derive(Clone)]
pub struct AuthGateService<S> {
    inner: S,
    options: Arc<GateOptions>,
}

impl<S> Service<Request<Body>> for AuthGateService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let options = self.options.clone();
        let not_ready_inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, not_ready_inner);

        Box::pin(async move {
            // CORS preflights are never challenged unless explicitly opted in.
            if req.method() == Method::OPTIONS && !options.auth_on_options {
                return inner.call(req).await;
            }

            let raw = match options.extractor.extract(&req) {
                Ok(token) => token.unwrap_or_default(),
                // A malformed credential is an error even when credentials
                // are optional.
                Err(err) => return Ok(dispatch(&options, err)),
            };

            match verify::verify_token(&options, &raw) {
                Ok(Some(token)) => {
                    context::bind(req.extensions_mut(), &options.identity_key, token);
                }
                Ok(None) => {
                    // Optional credentials and none presented: pass through
                    // with no identity bound.
                }
                Err(err) => return Ok(dispatch(&options, err)),
            }

            inner.call(req).await
        })
    }
}

fn dispatch(options: &GateOptions, err: GateError) -> Response {
    tracing::warn!(error = %err, "request authentication failed");
    options.error_handler.respond(&err)
}
