//! Exchange snapshots and their JSON encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::{RecorderError, Result};

/// Snapshot of the request or the response half of one exchange.
///
/// Headers hold one value per name; repeated headers keep their first value.
/// Empty fields are omitted from the JSON form. The body is base64 encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeContent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Capture time in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timestamp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_body",
        deserialize_with = "deserialize_body"
    )]
    pub body: Option<Vec<u8>>,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn serialize_body<S: Serializer>(body: &Option<Vec<u8>>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match body {
        Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

fn deserialize_body<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Vec<u8>>, D::Error> {
    let encoded: Option<String> = Option::deserialize(deserializer)?;
    encoded
        .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
        .transpose()
}

impl ExchangeContent {
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| RecorderError::DecodeError(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| RecorderError::DecodeError(e.to_string()))
    }

    /// Copy with the body removed, for metadata queries.
    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }

    /// Recorded status, or 200 when none was recorded.
    pub fn status_or_default(&self) -> u16 {
        self.code.unwrap_or(200)
    }
}
