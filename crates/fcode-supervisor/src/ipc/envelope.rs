use chrono::{DateTime, Utc};
use fcode_types::PROTOCOL_VERSION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::{IpcError, IpcResult};

/// Versioned wrapper carried by every frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub version: u32,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            message_id: new_message_id(),
            timestamp: Utc::now(),
            data,
        }
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn to_bytes(&self) -> IpcResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Checks the version before decoding `data`, so a newer peer gets
    /// `UnsupportedVersion` rather than a payload error.
    pub fn from_bytes(bytes: &[u8]) -> IpcResult<Self> {
        let raw: Envelope<serde_json::Value> = serde_json::from_slice(bytes)?;
        if raw.version != PROTOCOL_VERSION {
            return Err(IpcError::UnsupportedVersion(raw.version));
        }

        Ok(Envelope {
            version: raw.version,
            message_id: raw.message_id,
            timestamp: raw.timestamp,
            data: serde_json::from_value(raw.data)?,
        })
    }
}

/// Millisecond timestamp plus 64 random bits, both hex.
pub fn new_message_id() -> String {
    format!(
        "{:011x}-{:016x}",
        Utc::now().timestamp_millis(),
        rand::random::<u64>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_wire_field_names() {
        let envelope = Envelope::new(42u32);
        let json: serde_json::Value = serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();

        assert_eq!(json["version"], 1);
        assert_eq!(json["data"], 42);
        assert!(json["messageId"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_round_trip() {
        let envelope = Envelope::new(vec!["a".to_string(), "b".to_string()]);
        let decoded: Envelope<Vec<String>> = Envelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let bytes = br#"{"version":2,"messageId":"x","timestamp":"2024-01-01T00:00:00Z","data":{"future":true}}"#;
        let result = Envelope::<u32>::from_bytes(bytes);
        assert!(matches!(result, Err(IpcError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_bad_payload_is_serialization_error() {
        let bytes = br#"{"version":1,"messageId":"x","timestamp":"2024-01-01T00:00:00Z","data":"nope"}"#;
        assert!(matches!(
            Envelope::<u32>::from_bytes(bytes),
            Err(IpcError::Serialization(_))
        ));
    }

    #[test]
    fn test_message_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_message_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
