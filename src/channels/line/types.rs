//! LINE webhook payload types

use serde::Deserialize;

/// Body of a `POST /callback` delivery
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackRequest {
    /// Bot user id the events were sent to
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// One webhook event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event type (`message`, `follow`, `join`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Single-use token for answering this event
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub message: Option<EventMessage>,
    #[serde(default)]
    pub timestamp: i64,
    /// Stable id across redeliveries
    #[serde(default)]
    pub webhook_event_id: Option<String>,
    #[serde(default)]
    pub delivery_context: Option<DeliveryContext>,
}

impl Event {
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.kind == "message"
    }

    /// Whether the platform flagged this delivery as a retry
    #[must_use]
    pub fn is_redelivery(&self) -> bool {
        self.delivery_context.as_ref().is_some_and(|c| c.is_redelivery)
    }
}

/// Where an event came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// `user`, `group` or `room`
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

impl Source {
    /// Conversation to push to later: group, then room, then user
    #[must_use]
    pub fn push_target(&self) -> Option<&str> {
        [&self.group_id, &self.room_id, &self.user_id]
            .into_iter()
            .filter_map(Option::as_deref)
            .find(|id| !id.is_empty())
    }

    /// Conversation key: user, then group, then room
    #[must_use]
    pub fn session_key(&self) -> Option<&str> {
        [&self.user_id, &self.group_id, &self.room_id]
            .into_iter()
            .filter_map(Option::as_deref)
            .find(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    #[serde(default)]
    pub is_redelivery: bool,
}

/// Message payload of a `message` event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventMessage {
    Text {
        id: String,
        text: String,
    },
    Image {
        id: String,
    },
    Video {
        id: String,
        #[serde(default)]
        duration: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Sticker {
        id: String,
        package_id: String,
        sticker_id: String,
        #[serde(default)]
        keywords: Vec<String>,
        #[serde(default)]
        text: Option<String>,
    },
    /// Audio, file, location and future types
    #[serde(other)]
    Unknown,
}

impl EventMessage {
    /// Short type name for logging
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Video { .. } => "video",
            Self::Sticker { .. } => "sticker",
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_event() {
        let json = r#"{
            "destination": "Ubot",
            "events": [{
                "type": "message",
                "replyToken": "rt-1",
                "timestamp": 1700000000000,
                "webhookEventId": "01H",
                "deliveryContext": {"isRedelivery": false},
                "source": {"type": "user", "userId": "U1"},
                "message": {"type": "text", "id": "m1", "text": "hello", "quoteToken": "q"}
            }]
        }"#;

        let request: CallbackRequest = serde_json::from_str(json).unwrap();
        let event = &request.events[0];

        assert!(event.is_message());
        assert!(!event.is_redelivery());
        assert_eq!(event.reply_token.as_deref(), Some("rt-1"));
        assert_eq!(event.source.user_id.as_deref(), Some("U1"));
        assert_eq!(
            event.message,
            Some(EventMessage::Text {
                id: "m1".to_string(),
                text: "hello".to_string()
            })
        );
    }

    #[test]
    fn parses_sticker_with_keywords() {
        let json = r#"{"type": "sticker", "id": "m2", "packageId": "446", "stickerId": "1988",
                       "stickerResourceType": "STATIC", "keywords": ["happy", "smile"]}"#;
        let message: EventMessage = serde_json::from_str(json).unwrap();

        match message {
            EventMessage::Sticker {
                package_id,
                sticker_id,
                keywords,
                text,
                ..
            } => {
                assert_eq!(package_id, "446");
                assert_eq!(sticker_id, "1988");
                assert_eq!(keywords, ["happy", "smile"]);
                assert!(text.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unsupported_message_types_are_unknown() {
        let json = r#"{"type": "location", "id": "m3", "latitude": 25.0, "longitude": 121.5}"#;
        let message: EventMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message, EventMessage::Unknown);
    }

    #[test]
    fn non_message_events_parse() {
        let json = r#"{"events": [{"type": "follow", "replyToken": "rt", "source": {"type": "user", "userId": "U1"}}]}"#;
        let request: CallbackRequest = serde_json::from_str(json).unwrap();

        assert!(!request.events[0].is_message());
        assert!(request.events[0].message.is_none());
    }

    #[test]
    fn push_target_precedence() {
        let mut source = Source {
            kind: "group".to_string(),
            user_id: Some("U1".to_string()),
            group_id: Some("G1".to_string()),
            room_id: Some("R1".to_string()),
        };
        assert_eq!(source.push_target(), Some("G1"));

        source.group_id = None;
        assert_eq!(source.push_target(), Some("R1"));

        source.room_id = Some(String::new());
        assert_eq!(source.push_target(), Some("U1"));

        source.user_id = None;
        assert_eq!(source.push_target(), None);
    }

    #[test]
    fn session_key_prefers_user() {
        let mut source = Source {
            kind: "group".to_string(),
            user_id: Some("U1".to_string()),
            group_id: Some("G1".to_string()),
            room_id: Some("R1".to_string()),
        };
        assert_eq!(source.session_key(), Some("U1"));

        source.user_id = Some(String::new());
        assert_eq!(source.session_key(), Some("G1"));

        source.group_id = None;
        assert_eq!(source.session_key(), Some("R1"));

        source.room_id = None;
        assert_eq!(source.session_key(), None);
    }
}
