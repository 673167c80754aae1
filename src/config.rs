//! Gate configuration.
//!
//! Responsibility:
//! - the immutable options record every request handler shares
//! - defaults: mandatory credentials, `Authorization: Bearer` extraction,
//!   401 JSON responses, no algorithm constraint, 60s leeway

use std::sync::Arc;

use jsonwebtoken::Algorithm;

use crate::error::ErrorHandler;
use crate::extract::TokenExtractor;
use crate::verify::KeyResolver;

/// Extensions key used when none is configured; also what the
/// [`Identity`](crate::Identity) extractor reads.
pub const DEFAULT_IDENTITY_KEY: &str = "user";

/// Clock-skew tolerance applied to `exp` / `nbf`, in seconds.
pub(crate) const DEFAULT_LEEWAY_SECONDS: u64 = 60;

/// Immutable per-gate configuration.
///
/// Built once at router-assembly time and shared read-only across all
/// in-flight requests; the gate never mutates it afterwards.
#[derive(Clone)]
pub(crate) struct GateOptions {
    pub(crate) resolver: Arc<dyn KeyResolver>,
    pub(crate) extractor: Arc<dyn TokenExtractor>,
    pub(crate) error_handler: Arc<dyn ErrorHandler>,
    pub(crate) identity_key: String,
    pub(crate) signing_method: Option<Algorithm>,
    pub(crate) credentials_optional: bool,
    pub(crate) auth_on_options: bool,
    pub(crate) leeway: u64,
}
