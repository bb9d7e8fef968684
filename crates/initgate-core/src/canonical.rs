//! Canonical check-string construction
//!
//! The check string is the message the platform signed: every field except
//! the signature fields, sorted by key byte-wise, one `key=value` per line.

use std::collections::BTreeMap;

use crate::fields::{FieldMap, HASH_FIELD, SIGNATURE_FIELD};

/// Fields that never take part in the check string
pub const SIGNATURE_FIELDS: [&str; 2] = [HASH_FIELD, SIGNATURE_FIELD];

/// Field set with the signature fields removed
///
/// Only [`FieldMap::without_signature_fields`] builds one, so a
/// `CanonicalFields` can never contain `hash` or `signature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalFields {
    // `String` ordering is byte-wise, which is the required sort
    fields: BTreeMap<String, String>,
}

impl CanonicalFields {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Emit the check string
    pub fn serialize(&self) -> CheckString {
        let lines: Vec<String> = self
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        CheckString(lines.join("\n"))
    }
}

impl FieldMap {
    /// Drop `hash` and `signature`, keeping everything else for signing
    pub fn without_signature_fields(&self) -> CanonicalFields {
        let fields = self
            .iter()
            .filter(|(key, _)| !SIGNATURE_FIELDS.contains(key))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        CanonicalFields { fields }
    }
}

/// The message input to the keyed hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckString(String);

impl CheckString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Build the check string for a parsed field map
pub fn serialize(fields: &FieldMap) -> CheckString {
    fields.without_signature_fields().serialize()
}
