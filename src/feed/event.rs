//! Edit event records as they arrive on the feed.
//!
//! The feed sends one JSON object per message:
//!
//! ```json
//! {"type": "unspecified", "content": "Talk:Rust (programming language)"}
//! {"type": "newuser", "time": "2014-06-26T10:15:00Z"}
//! ```

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::FeedError;

/// Epoch values above this are treated as milliseconds rather than seconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// The `type` field of an edit event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A content edit (`"unspecified"` on the wire).
    Edit,
    /// A new account was created (`"newuser"` on the wire).
    NewUser,
    /// Any other value. Counted by the rate but otherwise ignored.
    Other(String),
}

impl EventKind {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Edit => "unspecified",
            EventKind::NewUser => "newuser",
            EventKind::Other(other) => other,
        }
    }
}

impl Default for EventKind {
    fn default() -> Self {
        EventKind::Other(String::new())
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        match value {
            "unspecified" => EventKind::Edit,
            "newuser" => EventKind::NewUser,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A null or non-string type is just another unhandled kind
        Ok(match Option::<RawText>::deserialize(deserializer)? {
            Some(RawText::Text(raw)) => EventKind::from(raw.as_str()),
            _ => EventKind::default(),
        })
    }
}

/// A single record from the edit feed.
///
/// Events are immutable once published; every pipeline sees the same clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditEvent {
    #[serde(rename = "type", default)]
    pub kind: EventKind,

    /// Edited content, present for [`EventKind::Edit`] records.
    #[serde(
        default,
        deserialize_with = "deserialize_content",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<String>,

    /// Event time, present for [`EventKind::NewUser`] records.
    #[serde(
        default,
        deserialize_with = "deserialize_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<DateTime<Utc>>,

    /// When this process received the record. Never read from the wire.
    #[serde(skip, default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl EditEvent {
    /// Build a content edit event.
    pub fn edit(content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Edit,
            content: Some(content.into()),
            time: None,
            received_at: Utc::now(),
        }
    }

    /// Build a new-user event.
    pub fn new_user(time: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::NewUser,
            content: None,
            time: Some(time),
            received_at: Utc::now(),
        }
    }

    /// Build an event of some other, unhandled type.
    pub fn other(kind: &str) -> Self {
        Self {
            kind: EventKind::from(kind),
            content: None,
            time: None,
            received_at: Utc::now(),
        }
    }

    /// Parse one feed record.
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(text.trim())?)
    }

    pub fn is_edit(&self) -> bool {
        self.kind == EventKind::Edit
    }

    pub fn is_new_user(&self) -> bool {
        self.kind == EventKind::NewUser
    }

    /// The time to place a chart marker at: the event's own time if it
    /// carried one, otherwise when it was received.
    pub fn marker_time(&self) -> DateTime<Utc> {
        self.time.unwrap_or(self.received_at)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Text(String),
    Number(f64),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Other(IgnoredAny),
}

/// Keeps string content; anything else reads as absent.
fn deserialize_content<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawText>::deserialize(deserializer)? {
        Some(RawText::Text(text)) => Some(text),
        _ => None,
    })
}

/// Accepts RFC 3339 strings or epoch numbers (seconds or milliseconds).
///
/// An unreadable time is treated as absent so the event itself survives.
fn deserialize_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTime>::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(RawTime::Text(text)) => parse_time_text(&text),
        Some(RawTime::Number(value)) => from_epoch(value),
        Some(RawTime::Other(_)) => None,
    })
}

fn parse_time_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(text.trim()) {
        return Some(time.with_timezone(&Utc));
    }
    text.trim().parse::<f64>().ok().and_then(from_epoch)
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let millis = if value > EPOCH_MILLIS_THRESHOLD {
        value as i64
    } else {
        (value * 1000.0) as i64
    };
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit() {
        let event = EditEvent::parse(r#"{"type":"unspecified","content":"Rust"}"#).unwrap();
        assert_eq!(event.kind, EventKind::Edit);
        assert_eq!(event.content.as_deref(), Some("Rust"));
        assert!(event.time.is_none());
    }

    #[test]
    fn test_parse_new_user_rfc3339() {
        let event =
            EditEvent::parse(r#"{"type":"newuser","time":"2014-06-26T10:15:00Z"}"#).unwrap();
        assert!(event.is_new_user());
        let expected = Utc.with_ymd_and_hms(2014, 6, 26, 10, 15, 0).unwrap();
        assert_eq!(event.time, Some(expected));
        assert_eq!(event.marker_time(), expected);
    }

    #[test]
    fn test_parse_epoch_seconds_and_millis() {
        let secs = EditEvent::parse(r#"{"type":"newuser","time":1403777700}"#).unwrap();
        let millis = EditEvent::parse(r#"{"type":"newuser","time":1403777700000}"#).unwrap();
        assert_eq!(secs.time, millis.time);
        assert_eq!(secs.time.unwrap().timestamp(), 1_403_777_700);
    }

    #[test]
    fn test_unreadable_time_falls_back_to_receipt() {
        let event = EditEvent::parse(r#"{"type":"newuser","time":"yesterday"}"#).unwrap();
        assert!(event.time.is_none());
        assert_eq!(event.marker_time(), event.received_at);
    }

    #[test]
    fn test_unknown_type_and_extra_fields() {
        let event = EditEvent::parse(r#"{"type":"unblock","page":"X","flags":[1,2]}"#).unwrap();
        assert_eq!(event.kind, EventKind::Other("unblock".to_string()));
        assert!(!event.is_edit());
        assert!(!event.is_new_user());
    }

    #[test]
    fn test_missing_type_is_other() {
        let event = EditEvent::parse(r#"{"content":"orphan"}"#).unwrap();
        assert_eq!(event.kind, EventKind::default());
    }

    #[test]
    fn test_odd_field_values_keep_the_event() {
        let event = EditEvent::parse(r#"{"type":"newuser","time":true}"#).unwrap();
        assert!(event.is_new_user());
        assert!(event.time.is_none());
        assert_eq!(event.marker_time(), event.received_at);

        let event = EditEvent::parse(r#"{"type":null,"content":"x"}"#).unwrap();
        assert_eq!(event.kind, EventKind::default());

        let event = EditEvent::parse(r#"{"type":7}"#).unwrap();
        assert_eq!(event.kind, EventKind::default());

        let event = EditEvent::parse(r#"{"type":"unspecified","content":42}"#).unwrap();
        assert!(event.is_edit());
        assert!(event.content.is_none());

        let event = EditEvent::parse(r#"{"type":"newuser","time":{"at":1}}"#).unwrap();
        assert!(event.time.is_none());
    }

    #[test]
    fn test_malformed_record() {
        assert!(matches!(EditEvent::parse("not json"), Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_kind_serializes_to_wire_name() {
        let json = serde_json::to_string(&EditEvent::edit("x")).unwrap();
        assert!(json.contains(r#""type":"unspecified""#));
        assert!(!json.contains("received_at"));
    }
}
