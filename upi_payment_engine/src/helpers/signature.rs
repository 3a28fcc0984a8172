//! # Gateway parameter signatures
//!
//! Every request we send to the gateway, and every callback it sends back to us, carries a `sign` field computed over
//! the remaining parameters and the merchant's shared secret key.
//!
//! ## Canonical form
//!
//! 1. The `sign` field itself is removed.
//! 2. Keys are sorted byte-wise (i.e. ASCII order, so upper case sorts before lower case).
//! 3. Each key with a non-empty value becomes a `key=value` segment. Empty values are dropped entirely; they do not
//!    produce a `key=` segment.
//! 4. `key=<secret>` is appended as the final segment and all segments are joined with `&`.
//!
//! ```text
//!    amount=500&mchId=1000&outTradeNo=UP1&payType=UPI&key=<secret>
//! ```
//!
//! The digest is the upper-case hex MD5 of that string. MD5 is what the gateway speaks and it is kept here for wire
//! compatibility only. Nothing else in this crate should reach for it.
use std::collections::BTreeMap;

use log::*;
use md5::{Digest, Md5};
use serde_json::{Number, Value};
use subtle::ConstantTimeEq;
use thiserror::Error;
use upi_common::Secret;

pub const SIGN_FIELD: &str = "sign";
const SECRET_FIELD: &str = "key";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Parameter set cannot be encoded for signing. {0}")]
    EncodingError(String),
}

/// A parameter set that has been through [`SignatureCodec::sign_params`] and so carries a valid `sign` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedParams(BTreeMap<String, String>);

impl SignedParams {
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn signature(&self) -> &str {
        self.get(SIGN_FIELD).unwrap_or_default()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

/// Computes and checks gateway signatures for a single merchant secret.
#[derive(Clone, Debug)]
pub struct SignatureCodec {
    secret: Secret<String>,
}

impl SignatureCodec {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    pub fn sign(&self, params: &BTreeMap<String, String>) -> String {
        sign(params, self.secret.reveal())
    }

    pub fn verify(&self, params: &BTreeMap<String, String>) -> bool {
        verify(params, self.secret.reveal())
    }

    /// Signs `params` and returns them with the `sign` field attached. Any `sign` already present is replaced.
    pub fn sign_params(&self, mut params: BTreeMap<String, String>) -> SignedParams {
        let signature = self.sign(&params);
        params.insert(SIGN_FIELD.to_string(), signature);
        SignedParams(params)
    }
}

/// Builds the canonical string that gets hashed. Exposed so that mismatches can be debugged against the gateway's own
/// examples.
pub fn canonical_string(params: &BTreeMap<String, String>, secret: &str) -> String {
    let mut segments = params
        .iter()
        .filter(|(k, v)| k.as_str() != SIGN_FIELD && !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<String>>();
    segments.push(format!("{SECRET_FIELD}={secret}"));
    segments.join("&")
}

pub fn sign(params: &BTreeMap<String, String>, secret: &str) -> String {
    let digest = Md5::digest(canonical_string(params, secret).as_bytes());
    hex::encode_upper(digest)
}

/// Recomputes the digest over `params` (minus `sign`) and compares it to the supplied `sign` in constant time.
///
/// A missing or empty `sign` never verifies. Because every non-empty field takes part in the digest, an extra or a
/// missing field changes the result just like a modified value does.
pub fn verify(params: &BTreeMap<String, String>, secret: &str) -> bool {
    let supplied = match params.get(SIGN_FIELD) {
        Some(s) if !s.is_empty() => s,
        _ => {
            trace!("🔏️ No signature present in parameter set");
            return false;
        },
    };
    let expected = sign(params, secret);
    let lengths_equal = supplied.len().ct_eq(&expected.len());
    let padded = pad_to(supplied.as_bytes(), expected.len());
    (lengths_equal & padded.as_slice().ct_eq(expected.as_bytes())).into()
}

fn pad_to(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let n = bytes.len().min(len);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Flattens a JSON object into the string map the codec works on.
///
/// Strings are taken verbatim and booleans become `true`/`false`. Numbers are written the way the gateway prints them
/// when it signs, so `500.00` signs as `500` and `12.50` as `12.5`. `null` counts as an absent value. Nested objects and
/// arrays have no canonical form and are rejected.
pub fn params_from_json(value: &Value) -> Result<BTreeMap<String, String>, SignatureError> {
    let object = value
        .as_object()
        .ok_or_else(|| SignatureError::EncodingError("Expected a JSON object at the top level".into()))?;
    let mut params = BTreeMap::new();
    for (key, v) in object {
        let s = match v {
            Value::String(s) => s.clone(),
            Value::Number(n) => number_text(n),
            Value::Bool(b) => b.to_string(),
            Value::Null => continue,
            Value::Array(_) | Value::Object(_) => {
                return Err(SignatureError::EncodingError(format!("Field '{key}' is not a scalar value")));
            },
        };
        params.insert(key.clone(), s);
    }
    Ok(params)
}

/// Shortest decimal text for a JSON number, with no trailing `.0` on whole values.
fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
