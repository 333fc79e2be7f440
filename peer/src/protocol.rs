//! Membership message bodies.

use serde::{Deserialize, Serialize};

/// What a peer sends when announcing itself or heartbeating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncePayload {
    /// The sender's cache base URL, e.g. `http://10.0.0.2:8081`.
    pub groupcache_address: String,
    /// The sender's admin/API base URL, e.g. `http://10.0.0.2:8080`.
    pub api_address: String,
}

/// The receiver's reply to an announce: every peer it currently knows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnounceResponse {
    pub known_peers: Vec<AnnouncePayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_wire_names() {
        let payload = AnnouncePayload {
            groupcache_address: "http://a:8081".into(),
            api_address: "http://a:8080".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["groupcache_address"], "http://a:8081");
        assert_eq!(json["api_address"], "http://a:8080");
    }

    #[test]
    fn test_response_roundtrip() {
        let response = AnnounceResponse {
            known_peers: vec![AnnouncePayload {
                groupcache_address: "http://a:8081".into(),
                api_address: "http://a:8080".into(),
            }],
        };
        let json = serde_json::to_string(&response).unwrap();
        let back: AnnounceResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }
}
