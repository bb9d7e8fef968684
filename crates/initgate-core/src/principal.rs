//! Verified principal

use serde::{Deserialize, Serialize};

use crate::error::{Rejection, Result};
use crate::fields::{FieldMap, USER_FIELD};

/// User profile carried in the `user` field
///
/// Only `id` is required; unknown members are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,

    #[serde(default)]
    pub is_premium: bool,

    #[serde(default)]
    pub allows_write_to_pm: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Identity established by a successful verification
///
/// Owned by the caller; nothing in the verifier keeps a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Platform user identifier
    pub user_id: i64,

    /// Issuance time as sent (epoch seconds)
    pub auth_date: i64,

    /// Parsed profile
    pub user: UserProfile,

    /// The `user` field exactly as signed
    pub user_payload: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_instance: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_param: Option<String>,
}

impl Principal {
    /// Extract claims from already-authenticated fields
    ///
    /// Must only be called once the signature has been verified.
    pub fn from_fields(fields: &FieldMap, auth_date: i64) -> Result<Self> {
        let user_payload = fields
            .get(USER_FIELD)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Rejection::MalformedInput("no user field".into()))?;

        let user: UserProfile = serde_json::from_str(user_payload)?;

        let optional = |key: &str| fields.get(key).map(str::to_string);

        Ok(Self {
            user_id: user.id,
            auth_date,
            user,
            user_payload: user_payload.to_string(),
            query_id: optional("query_id"),
            chat_type: optional("chat_type"),
            chat_instance: optional("chat_instance"),
            start_param: optional("start_param"),
        })
    }
}
