//! Wire protocol for the socket channel (spec §6 "Socket protocol").
//!
//! Plain JSON-over-WebSocket, namespace-less: every frame is
//! `{"event": "<name>", "data": {...}}`. A browser `WebSocket` can't set
//! custom headers on the upgrade request, so handshake auth travels as a
//! `?token=` query parameter rather than the `auth.token` socket.io carries
//! — the one place this transport necessarily differs from the spec's
//! socket.io-shaped description of itself.
//!
//! Dynamic `any`-typed payloads become one enum variant per event with a
//! fixed field set (SPEC_FULL "Design notes"); an unrecognized `event` value
//! fails deserialization and is dropped with a log line by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The opaque envelope carried by `offer`/`answer`/`ice-candidate`. The
/// server never inspects `data` — it is a pass-through for SDP/ICE payloads.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalPayload {
    pub meeting_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub data: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinMeeting {
        meeting_id: String,
    },
    Offer(SignalPayload),
    Answer(SignalPayload),
    IceCandidate(SignalPayload),
    ToggleAudio {
        meeting_id: String,
        audio_enabled: bool,
    },
    ToggleVideo {
        meeting_id: String,
        video_enabled: bool,
    },
    ScreenShare {
        meeting_id: String,
        #[serde(default)]
        stream_id: Option<String>,
        active: bool,
    },
    ChatMessage {
        meeting_id: String,
        message: String,
    },
    MuteParticipant {
        meeting_id: String,
        participant_id: String,
    },
    RemoveParticipant {
        meeting_id: String,
        participant_id: String,
    },
    RaiseHand {
        meeting_id: String,
        raised: bool,
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        username: Option<String>,
    },
    Reaction {
        meeting_id: String,
        emoji: String,
    },
    LeaveMeeting {
        meeting_id: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    pub socket_id: String,
    #[serde(rename = "odId")]
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSender {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    UserJoined {
        socket_id: String,
        #[serde(rename = "odId")]
        user_id: String,
        username: String,
    },
    UserLeft {
        socket_id: String,
        #[serde(rename = "odId")]
        user_id: String,
    },
    ExistingParticipants(Vec<ParticipantSnapshot>),
    Offer(SignalPayload),
    Answer(SignalPayload),
    IceCandidate(SignalPayload),
    AudioToggled {
        meeting_id: String,
        audio_enabled: bool,
        user_id: String,
    },
    VideoToggled {
        meeting_id: String,
        video_enabled: bool,
        user_id: String,
    },
    ScreenShare {
        meeting_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stream_id: Option<String>,
        active: bool,
        user_id: String,
    },
    ChatMessage {
        sender: ChatSender,
        message: String,
        #[serde(rename = "type")]
        kind: String,
        timestamp: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<JsonValue>,
    },
    MutedByHost {
        meeting_id: String,
    },
    RemovedFromMeeting {
        meeting_id: String,
    },
    HandRaised {
        meeting_id: String,
        raised: bool,
        #[serde(rename = "odId")]
        user_id: String,
        username: String,
    },
    Reaction {
        meeting_id: String,
        emoji: String,
        user_id: String,
    },
    /// Not in the spec's event list; used only to tell a socket its own
    /// event was dropped (e.g. refused `join-meeting` into an ended
    /// meeting), so the client isn't left silently stuck.
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_meeting_round_trips_through_the_envelope() {
        let raw = r#"{"event":"join-meeting","data":{"meetingId":"ABC-123-XYZ"}}"#;
        let parsed: ClientEvent = serde_json::from_str(raw).unwrap();
        match parsed {
            ClientEvent::JoinMeeting { meeting_id } => assert_eq!(meeting_id, "ABC-123-XYZ"),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn offer_keeps_data_opaque() {
        let raw = r#"{"event":"offer","data":{"meetingId":"m","to":"u2","data":{"sdp":"v=0"}}}"#;
        let parsed: ClientEvent = serde_json::from_str(raw).unwrap();
        match parsed {
            ClientEvent::Offer(payload) => {
                assert_eq!(payload.to.as_deref(), Some("u2"));
                assert_eq!(payload.data["sdp"], "v=0");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_fails_to_parse() {
        let raw = r#"{"event":"teleport","data":{}}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn server_event_serializes_with_event_tag() {
        let event = ServerEvent::UserLeft {
            socket_id: "s1".into(),
            user_id: "u1".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "user-left");
        assert_eq!(json["data"]["odId"], "u1");
    }
}
