//! Token validation pipeline.
//!
//! Responsibility:
//! - structural parse (no trust yet) → algorithm guard → key resolution →
//!   signature + validity-window verification
//! - the algorithm guard runs before the caller's key resolver, so a forged
//!   header can never steer key selection (the classic "alg confusion" attack)

use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::GateOptions;
use crate::error::{BoxError, GateError};

/// A structurally parsed token whose signature has NOT been checked.
///
/// This is what a [`KeyResolver`] gets to look at, typically to pick a key by
/// `kid` or issuer. Nothing in here can be trusted until verification
/// completes.
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    pub header: Header,
    pub claims: Map<String, Value>,
}

/// Maps a (still unverified) token to the key that should verify it.
///
/// Static secrets, per-issuer lookup and rotating key sets all fit behind
/// this. Closures implement it directly.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, token: &UnverifiedToken) -> Result<DecodingKey, BoxError>;
}

impl<F> KeyResolver for F
where
    F: Fn(&UnverifiedToken) -> Result<DecodingKey, BoxError> + Send + Sync,
{
    fn resolve(&self, token: &UnverifiedToken) -> Result<DecodingKey, BoxError> {
        self(token)
    }
}

/// Resolver for the common single-static-key deployment.
#[derive(Clone)]
pub struct StaticKey(pub DecodingKey);

impl KeyResolver for StaticKey {
    fn resolve(&self, _token: &UnverifiedToken) -> Result<DecodingKey, BoxError> {
        Ok(self.0.clone())
    }
}

/// A fully verified token: its claims plus the algorithm that verified it.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub claims: Map<String, Value>,
    pub algorithm: Algorithm,
}

impl VerifiedToken {
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}

// The raw header is inspected before the codec parses it, because the codec
// cannot even represent `alg: "none"` and we need to tell "unsigned" apart
// from "garbage".
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

fn expected_name(required: Option<Algorithm>) -> String {
    match required {
        Some(alg) => format!("{alg:?}"),
        None => "a signed algorithm".to_string(),
    }
}

/// Read the declared algorithm straight from the raw header segment.
fn declared_algorithm(
    header_segment: &str,
    required: Option<Algorithm>,
) -> Result<Algorithm, GateError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(header_segment)
        .map_err(|e| GateError::MalformedToken(format!("undecodable header segment: {e}")))?;
    let raw: RawHeader = serde_json::from_slice(&bytes)
        .map_err(|e| GateError::MalformedToken(format!("unreadable header: {e}")))?;

    // Unsigned tokens are never acceptable, whether or not a method is
    // required.
    if raw.alg.eq_ignore_ascii_case("none") {
        return Err(GateError::AlgorithmMismatch {
            expected: expected_name(required),
            found: raw.alg,
        });
    }

    Algorithm::from_str(&raw.alg)
        .map_err(|_| GateError::MalformedToken(format!("unknown algorithm {:?}", raw.alg)))
}

fn decode_claims(segment: &str) -> Result<Map<String, Value>, GateError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| GateError::MalformedToken(format!("undecodable claims segment: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| GateError::MalformedToken(format!("unreadable claims: {e}")))
}

fn classify_codec_error(e: jsonwebtoken::errors::Error) -> GateError {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::InvalidSignature => GateError::SignatureMismatch,
        ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => GateError::Expired,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            GateError::MalformedToken(e.to_string())
        }
        _ => GateError::Codec(e),
    }
}

/// Validate a raw token string against the gate's options.
///
/// `Ok(None)` is the optional-credentials skip: no token was presented and
/// the gate is configured to let that through unauthenticated. It is not the
/// same as a verified anonymous identity; nothing gets bound downstream.
pub(crate) fn verify_token(
    options: &GateOptions,
    raw: &str,
) -> Result<Option<VerifiedToken>, GateError> {
    if raw.is_empty() {
        return if options.credentials_optional {
            Ok(None)
        } else {
            Err(GateError::MissingToken)
        };
    }

    let segments: Vec<&str> = raw.split('.').collect();
    if segments.len() != 3 {
        return Err(GateError::MalformedToken(
            "expected three dot-separated segments".to_string(),
        ));
    }

    let declared = declared_algorithm(segments[0], options.signing_method)?;

    // Decode the remaining structure without trusting the signature. The key
    // resolver needs to see header and claims; the signature is only checked
    // once it has handed back a key.
    let header = jsonwebtoken::decode_header(raw)
        .map_err(|e| GateError::MalformedToken(format!("unparseable header: {e}")))?;
    let claims = decode_claims(segments[1])?;

    // Algorithm guard: a required method is compared against the declared
    // header before the resolver runs, so a forged token cannot steer key
    // selection.
    if let Some(required) = options.signing_method {
        if declared != required {
            return Err(GateError::AlgorithmMismatch {
                expected: format!("{required:?}"),
                found: format!("{declared:?}"),
            });
        }
    }

    let unverified = UnverifiedToken { header, claims };

    let key = options
        .resolver
        .resolve(&unverified)
        .map_err(GateError::KeyResolution)?;

    // Pin verification to the declared (and by now vetted) algorithm. `exp`
    // and `nbf` are checked when present, with the configured leeway, but are
    // not required to be present.
    let mut validation = Validation::new(declared);
    validation.leeway = options.leeway;
    validation.required_spec_claims.clear();
    validation.validate_nbf = true;
    validation.validate_aud = false;

    let data = jsonwebtoken::decode::<Map<String, Value>>(raw, &key, &validation)
        .map_err(classify_codec_error)?;

    Ok(Some(VerifiedToken {
        claims: data.claims,
        algorithm: declared,
    }))
}
