//! Bearer-token authentication gate for axum.
//!
//! `token-gate` sits in front of a router, pulls a signed bearer token (JWT)
//! out of each request, verifies it against a caller-supplied key-resolution
//! policy and, on success, binds the decoded claims into the request
//! extensions for handlers to read. On failure the request is answered
//! directly (401 JSON by default) and never reaches the inner service.
//!
//! Verification order is deliberate: when a required signing method is
//! configured, the token's declared algorithm is checked *before* the key
//! resolver runs, so a forged header can never steer key selection
//! (algorithm-confusion defense). Unsigned (`alg: "none"`) tokens are always
//! rejected.
//!
//! ```no_run
//! use axum::{Router, routing::get};
//! use token_gate::{Algorithm, AuthGateLayer, DecodingKey, Identity, StaticKey};
//!
//! async fn whoami(Identity(token): Identity) -> String {
//!     token
//!         .claim("sub")
//!         .and_then(|v| v.as_str())
//!         .unwrap_or("unknown")
//!         .to_string()
//! }
//!
//! let gate = AuthGateLayer::new(StaticKey(DecodingKey::from_secret(b"secret")))
//!     .signing_method(Algorithm::HS256);
//!
//! let app: Router = Router::new().route("/whoami", get(whoami)).layer(gate);
//! ```
//!
//! Key resolution is a capability: anything that can map a (still
//! unverified) token to a [`DecodingKey`] works, from [`StaticKey`] up to a
//! per-tenant or rotating-keyset lookup implemented as a closure or a
//! [`KeyResolver`] type of your own.

mod config;
mod context;
mod error;
mod extract;
mod middleware;
mod verify;

pub use config::DEFAULT_IDENTITY_KEY;
pub use context::{Identity, IdentityContext};
pub use error::{BoxError, DefaultErrorHandler, ErrorHandler, GateError};
pub use extract::{BearerHeader, FirstOf, QueryParam, TokenExtractor};
pub use middleware::{AuthGateLayer, AuthGateService};
pub use verify::{KeyResolver, StaticKey, UnverifiedToken, VerifiedToken};

// Codec types callers need to configure the gate.
pub use jsonwebtoken::{Algorithm, DecodingKey};
