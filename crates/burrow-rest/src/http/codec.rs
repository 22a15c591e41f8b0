//! The wire-format boundary
//!
//! Payloads cross this boundary as `serde_json::Value`; shape-specific
//! typing happens at the call site. The default codec is plain JSON, and
//! embedders can swap it without forking the client.

use serde_json::Value;

use crate::http::transport::BoxError;

/// Encodes request payloads and decodes response payloads.
pub trait Codec: Send + Sync {
    /// Serialize `payload` into a request body.
    fn encode(&self, payload: &Value) -> Result<Vec<u8>, BoxError>;

    /// Parse a response body.
    fn decode(&self, body: &[u8]) -> Result<Value, BoxError>;
}

/// serde_json passthrough codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, payload: &Value) -> Result<Vec<u8>, BoxError> {
        serde_json::to_vec(payload).map_err(Into::into)
    }

    fn decode(&self, body: &[u8]) -> Result<Value, BoxError> {
        serde_json::from_slice(body).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_codec_round_trips() {
        let payload = json!({"tunnel_identifier": "ci-tunnel", "shared_tunnel": false});

        let encoded = JsonCodec.encode(&payload).unwrap();
        let decoded = JsonCodec.decode(&encoded).unwrap();

        assert_eq!(decoded, payload);
    }

    #[test]
    fn json_codec_rejects_malformed_input() {
        assert!(JsonCodec.decode(b"not json").is_err());
    }
}
