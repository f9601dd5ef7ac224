//! Vault API wire types.
//!
//! Every field carries a serde default so that responses from older or
//! newer vault versions never fail to decode; callers check for the
//! presence of what they need.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A secret returned by the vault's logical and token endpoints.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Secret {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub lease_id: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub auth: Option<Auth>,
}

impl Secret {
    /// Whether the secret carries any payload data.
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|data| !data.is_empty())
    }
}

/// The auth block of a token-producing response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub client_token: String,
    #[serde(default)]
    pub accessor: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
}

/// Request body for token creation against a role.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TokenCreateRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewable: Option<bool>,
}

/// One entry of the vault's mount table.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MountOutput {
    #[serde(rename = "type", default)]
    pub engine_type: String,
}
