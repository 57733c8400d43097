// ============================================
// File: crates/ooband-core/src/protocol/interaction.rs
// ============================================
//! # Interaction Records
//!
//! One record per captured DNS query, HTTP request or SMTP delivery.
//! Serialized to JSON, sealed, stored, and decoded again by the client.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Protocol an interaction was captured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// DNS query.
    Dns,
    /// HTTP request.
    Http,
    /// SMTP delivery.
    Smtp,
}

impl Protocol {
    /// Lowercase protocol name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::Http => "http",
            Self::Smtp => "smtp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A captured out-of-band interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Interaction {
    /// Capture protocol.
    pub protocol: Protocol,
    /// Matched identifier label.
    pub unique_id: String,
    /// Labels up to and including the matched label.
    pub full_id: String,
    /// DNS query type, for DNS captures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q_type: Option<String>,
    /// Raw request text.
    pub raw_request: String,
    /// What the listener answered, where meaningful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    /// SMTP envelope sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_from: Option<String>,
    /// Peer IP address.
    pub remote_address: String,
    /// Capture time.
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    /// Starts a record for `protocol` stamped with the current time.
    pub fn new(
        protocol: Protocol,
        unique_id: impl Into<String>,
        full_id: impl Into<String>,
        raw_request: impl Into<String>,
        remote_address: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            unique_id: unique_id.into(),
            full_id: full_id.into(),
            q_type: None,
            raw_request: raw_request.into(),
            raw_response: None,
            smtp_from: None,
            remote_address: remote_address.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_json_shape() {
        let mut interaction = Interaction::new(
            Protocol::Smtp,
            "zzzzzzzzzzzzzzzzzzzzyyyyyyyyyyyyy",
            "zzzzzzzzzzzzzzzzzzzzyyyyyyyyyyyyy",
            "Subject: hi\r\n\r\nbody",
            "198.51.100.7",
        );
        interaction.smtp_from = Some("attacker@example.net".into());

        let json = serde_json::to_value(&interaction).unwrap();
        assert_eq!(json["protocol"], "smtp");
        assert_eq!(json["unique-id"], "zzzzzzzzzzzzzzzzzzzzyyyyyyyyyyyyy");
        assert_eq!(json["smtp-from"], "attacker@example.net");
        assert_eq!(json["remote-address"], "198.51.100.7");
        assert!(json.get("q-type").is_none());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_protocol_display() {
        assert_eq!(Protocol::Dns.to_string(), "dns");
        assert_eq!(Protocol::Http.to_string(), "http");
        assert_eq!(Protocol::Smtp.to_string(), "smtp");
    }
}
