//! Persistence envelope codec.
//!
//! Persisted objects are stored as a JSON-encoded string under the single
//! key `"json"` of the vault secret payload, so the secret backend sees
//! opaque bytes. The envelope is a compatibility contract with previously
//! persisted state; do not switch to nested-object storage.

use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Encode a value into the `{"json": "<string>"}` envelope.
pub fn encode_envelope<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    let payload = serde_json::to_string(value)?;
    let mut data = Map::new();
    data.insert("json".to_string(), Value::String(payload));
    Ok(data)
}

/// Decode a value out of the `{"json": "<string>"}` envelope.
///
/// Decoding is strict: a missing `"json"` key, a non-string value, or
/// malformed JSON inside the string all surface as [`Error::CorruptState`].
pub fn decode_envelope<T: DeserializeOwned>(data: &Map<String, Value>) -> Result<T> {
    let payload = data
        .get("json")
        .ok_or_else(|| Error::CorruptState("missing 'json' key".to_string()))?;

    let payload = payload.as_str().ok_or_else(|| {
        Error::CorruptState(format!("'json' value is not a string: {payload}"))
    })?;

    serde_json::from_str(payload)
        .map_err(|err| Error::CorruptState(format!("malformed 'json' payload: {err}")))
}
