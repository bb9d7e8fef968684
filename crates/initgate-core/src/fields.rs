//! Init-data field parsing
//!
//! Decodes the raw `key=value&key=value` blob into a [`FieldMap`]. Exactly one
//! level of form-urlencoding is removed; values are never decoded twice, since
//! a second pass would let an attacker smuggle `%26`/`%3D` past the signature.

use percent_encoding::percent_decode_str;
use std::borrow::Cow;

use crate::error::{Rejection, Result};

/// Field carrying the HMAC signature
pub const HASH_FIELD: &str = "hash";

/// Field carrying the platform's public-key signature (excluded from the check string)
pub const SIGNATURE_FIELD: &str = "signature";

/// Field carrying the issuance timestamp (epoch seconds)
pub const AUTH_DATE_FIELD: &str = "auth_date";

/// Field carrying the JSON user profile
pub const USER_FIELD: &str = "user";

/// Upper bound on raw init-data length
pub const MAX_INIT_DATA_LEN: usize = 8 * 1024;

/// Decoded init-data fields in the order they were received
///
/// Keys are unique. Order carries no meaning; the canonical serializer sorts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    /// Create an empty field map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, rejecting duplicate names
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if self.contains_key(&key) {
            return Err(Rejection::MalformedInput("duplicate field name".into()));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    /// Look up a field value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// The supplied HMAC signature, if present and non-empty
    pub fn hash(&self) -> Option<&str> {
        self.get(HASH_FIELD).filter(|h| !h.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate fields in received order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parse a raw init-data string
///
/// # Errors
/// * `MalformedInput` for oversized input, a bad percent escape, non-UTF-8
///   bytes, an empty field name or a duplicate field name
/// * `MissingHash` if no non-empty `hash` field is present
pub fn parse(raw: &str) -> Result<FieldMap> {
    if raw.len() > MAX_INIT_DATA_LEN {
        return Err(Rejection::MalformedInput(format!(
            "init data exceeds {} bytes",
            MAX_INIT_DATA_LEN
        )));
    }

    let mut fields = FieldMap::new();

    for (index, segment) in raw.split('&').enumerate() {
        if segment.is_empty() {
            continue;
        }

        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));

        let key = decode_component(key, index)?;
        if key.is_empty() {
            return Err(Rejection::MalformedInput(format!(
                "empty field name in segment {}",
                index
            )));
        }
        let value = decode_component(value, index)?;

        fields.insert(key, value)?;
    }

    if fields.hash().is_none() {
        return Err(Rejection::MissingHash);
    }

    Ok(fields)
}

/// Remove one level of form-urlencoding from a key or value
fn decode_component(encoded: &str, index: usize) -> Result<String> {
    let bytes = encoded.as_bytes();
    for (pos, byte) in bytes.iter().enumerate() {
        if *byte == b'%' {
            let escape = bytes.get(pos + 1..pos + 3);
            let valid = escape.is_some_and(|e| e.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(Rejection::MalformedInput(format!(
                    "invalid percent escape in segment {}",
                    index
                )));
            }
        }
    }

    // `+` is a space in form encoding; an encoded `%2B` still decodes to `+`
    let spaced: Cow<'_, str> = if encoded.contains('+') {
        Cow::Owned(encoded.replace('+', " "))
    } else {
        Cow::Borrowed(encoded)
    };

    percent_decode_str(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| {
            Rejection::MalformedInput(format!("segment {} is not valid UTF-8", index))
        })
}
