//! The envelope exchanged between peers.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Kind of message carried by an [`Envelope`].
///
/// Any `type` value other than `text` or `command` is kept verbatim as
/// `Unknown` so that re-encoding an envelope reproduces it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// Plain chat text.
    Text,
    /// A command for the peer. Recognized but never executed.
    Command,
    /// Any other type value.
    Unknown(String),
}

impl MessageType {
    /// Returns the wire representation of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Command => "command",
            Self::Unknown(raw) => raw,
        }
    }

    /// Returns true for types the listener does not recognize.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl From<String> for MessageType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "text" => Self::Text,
            "command" => Self::Command,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<&str> for MessageType {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Text => "text".to_string(),
            MessageType::Command => "command".to_string(),
            MessageType::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured message: who sent it, when, what kind, and its content.
///
/// The `sender` field is self-reported by the remote peer and is not
/// verified against the connection it arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Onion address of the sender.
    pub sender: String,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Message body.
    pub content: String,
}

impl Envelope {
    /// Creates an envelope stamped with the current UTC time.
    pub fn new(sender: impl Into<String>, kind: MessageType, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            timestamp: utc_timestamp(),
            kind,
            content: content.into(),
        }
    }

    /// Creates a `text` envelope stamped with the current UTC time.
    pub fn text(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(sender, MessageType::Text, content)
    }

    /// The line shown to the operator and written to the log on receipt.
    pub fn describe(&self) -> String {
        let label = match self.kind {
            MessageType::Text => "Message from",
            MessageType::Command => "Command from",
            MessageType::Unknown(_) => "Unknown message type from",
        };
        format!("{} {}: {}", label, self.sender, self.content)
    }
}

/// Current time as `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_parsing() {
        assert_eq!(MessageType::from("text"), MessageType::Text);
        assert_eq!(MessageType::from("command"), MessageType::Command);
        assert_eq!(
            MessageType::from("TEXT"),
            MessageType::Unknown("TEXT".to_string())
        );
        assert!(MessageType::from("ping").is_unknown());
    }

    #[test]
    fn test_unknown_type_preserved_on_wire() {
        let json = r#"{"sender":"a.onion","timestamp":"t","type":"ping","content":"c"}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.kind, MessageType::Unknown("ping".to_string()));

        let back = serde_json::to_string(&envelope).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn test_field_order() {
        let envelope = Envelope {
            sender: "abc.onion".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            kind: MessageType::Text,
            content: "hi".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"sender":"abc.onion","timestamp":"2024-01-01T00:00:00Z","type":"text","content":"hi"}"#
        );
    }

    #[test]
    fn test_describe() {
        let mut envelope = Envelope::text("abc.onion", "hi");
        assert_eq!(envelope.describe(), "Message from abc.onion: hi");

        envelope.kind = MessageType::Command;
        assert_eq!(envelope.describe(), "Command from abc.onion: hi");

        envelope.kind = MessageType::from("weird");
        assert_eq!(envelope.describe(), "Unknown message type from abc.onion: hi");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = utc_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000000Z".len());
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
