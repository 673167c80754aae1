//! Token extraction strategies.
//!
//! "Absent" and "malformed" are different outcomes here: `Ok(None)` is left to
//! the gate's optional-credentials policy, while `Err` means a credential WAS
//! presented but is unusable, which is always a hard failure.

use axum::body::Body;
use axum::http::{HeaderName, Request, header};

use crate::error::GateError;

/// Pulls a raw token out of a request.
pub trait TokenExtractor: Send + Sync {
    fn extract(&self, req: &Request<Body>) -> Result<Option<String>, GateError>;
}

/// `Authorization: Bearer <token>` header extractor (the default).
#[derive(Debug, Clone)]
pub struct BearerHeader {
    header: HeaderName,
}

impl BearerHeader {
    pub fn new() -> Self {
        Self {
            header: header::AUTHORIZATION,
        }
    }

    /// Read the bearer credential from a non-standard header.
    pub fn named(header: HeaderName) -> Self {
        Self { header }
    }
}

impl Default for BearerHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenExtractor for BearerHeader {
    fn extract(&self, req: &Request<Body>) -> Result<Option<String>, GateError> {
        let Some(value) = req.headers().get(&self.header) else {
            return Ok(None);
        };
        let value = value.to_str().map_err(|_| {
            GateError::MalformedToken("authorization header is not valid UTF-8".into())
        })?;
        if value.is_empty() {
            return Ok(None);
        }

        let mut parts = value.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
                Ok(Some(token.to_string()))
            }
            _ => Err(GateError::MalformedToken(
                "authorization header must be of the form `Bearer <token>`".into(),
            )),
        }
    }
}

/// Query-string parameter extractor.
///
/// Absence is never an error: there is no way to present a malformed
/// credential through a missing parameter.
#[derive(Debug, Clone)]
pub struct QueryParam {
    name: String,
}

impl QueryParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TokenExtractor for QueryParam {
    fn extract(&self, req: &Request<Body>) -> Result<Option<String>, GateError> {
        let query = req.uri().query().unwrap_or_default();
        let token = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key.as_ref() == self.name.as_str())
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());
        Ok(token)
    }
}

/// Tries extractors in order; the first non-empty token wins.
///
/// A structural error from any source fails the whole chain immediately: a
/// malformed credential must not degrade into "no credential".
pub struct FirstOf {
    sources: Vec<Box<dyn TokenExtractor>>,
}

impl FirstOf {
    pub fn new(sources: Vec<Box<dyn TokenExtractor>>) -> Self {
        Self { sources }
    }
}

impl TokenExtractor for FirstOf {
    fn extract(&self, req: &Request<Body>) -> Result<Option<String>, GateError> {
        for source in &self.sources {
            if let Some(token) = source.extract(req)? {
                return Ok(Some(token));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn bearer_header_extracts_the_token() {
        let req = request("/", Some("Bearer abc.def.ghi"));
        let token = BearerHeader::new().extract(&req).unwrap();
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let req = request("/", Some("bearer abc"));
        assert_eq!(
            BearerHeader::new().extract(&req).unwrap().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn absent_header_is_not_an_error() {
        let req = request("/", None);
        assert!(BearerHeader::new().extract(&req).unwrap().is_none());
    }

    #[test]
    fn wrong_scheme_is_malformed() {
        let req = request("/", Some("notbearer abc"));
        assert!(BearerHeader::new().extract(&req).is_err());
    }

    #[test]
    fn scheme_without_token_is_malformed() {
        let req = request("/", Some("bearer"));
        assert!(BearerHeader::new().extract(&req).is_err());
    }

    #[test]
    fn query_param_extracts_and_tolerates_absence() {
        let extractor = QueryParam::new("access_token");

        let req = request("/me?access_token=tok123&x=1", None);
        assert_eq!(extractor.extract(&req).unwrap().as_deref(), Some("tok123"));

        let req = request("/me?x=1", None);
        assert!(extractor.extract(&req).unwrap().is_none());
    }

    #[test]
    fn first_of_returns_the_first_hit() {
        let extractor = FirstOf::new(vec![
            Box::new(QueryParam::new("access_token")),
            Box::new(BearerHeader::new()),
        ]);

        // First source empty, second yields.
        let req = request("/me", Some("Bearer from-header"));
        assert_eq!(
            extractor.extract(&req).unwrap().as_deref(),
            Some("from-header")
        );

        // First source yields; second never consulted.
        let req = request("/me?access_token=from-query", Some("Bearer from-header"));
        assert_eq!(
            extractor.extract(&req).unwrap().as_deref(),
            Some("from-query")
        );
    }

    #[test]
    fn first_of_fails_fast_on_a_malformed_source() {
        let extractor = FirstOf::new(vec![
            Box::new(BearerHeader::new()),
            Box::new(QueryParam::new("access_token")),
        ]);

        // The query would yield a token, but the malformed header wins.
        let req = request("/me?access_token=tok123", Some("notbearer abc"));
        assert!(extractor.extract(&req).is_err());
    }

    #[test]
    fn first_of_with_no_hits_yields_nothing() {
        let extractor = FirstOf::new(vec![
            Box::new(QueryParam::new("access_token")),
            Box::new(BearerHeader::new()),
        ]);
        let req = request("/me", None);
        assert!(extractor.extract(&req).unwrap().is_none());
    }
}
