//! Per-request identity bindings.
//!
//! The gate writes one entry into the request extensions; handlers read it
//! back, either through [`IdentityContext`] or the [`Identity`] extractor.

use std::collections::HashMap;

use axum::extract::FromRequestParts;
use axum::http::{Extensions, StatusCode, request::Parts};

use crate::config::DEFAULT_IDENTITY_KEY;
use crate::verify::VerifiedToken;

/// All identity bindings made on a request.
///
/// Each gate instance writes exactly one entry; stacking gates with distinct
/// identity keys leaves earlier entries untouched.
#[derive(Debug, Clone, Default)]
pub struct IdentityContext {
    bindings: HashMap<String, VerifiedToken>,
}

impl IdentityContext {
    pub fn get(&self, key: &str) -> Option<&VerifiedToken> {
        self.bindings.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Bind `key → token`, preserving bindings made by earlier gates.
pub(crate) fn bind(extensions: &mut Extensions, key: &str, token: VerifiedToken) {
    let mut ctx = extensions.remove::<IdentityContext>().unwrap_or_default();
    ctx.bindings.insert(key.to_string(), token);
    extensions.insert(ctx);
}

/// Handler-side extractor for the token bound under the default identity key.
///
/// The gate must have run and bound an identity; otherwise this rejects with
/// 401 (route not actually behind the gate, or credentials were optional and
/// absent). Bindings under non-default keys are read through
/// [`IdentityContext`] directly.
#[derive(Debug, Clone)]
pub struct Identity(pub VerifiedToken);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .and_then(|ctx| ctx.get(DEFAULT_IDENTITY_KEY))
            .cloned()
            .map(Identity)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
