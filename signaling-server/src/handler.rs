//! The WebSocket upgrade handler, socket lifecycle, and event dispatch table
//! (spec §4.F Signaling Router, §4.G Room Event Bus).
//!
//! The teacher dispatches inbound actor messages through `StreamHandler` on
//! a typed `ws::Message`; this is the same shape translated to axum: one
//! read loop per socket, one `match` arm per `ClientEvent` variant instead
//! of a callback per event name (SPEC_FULL "Design notes").

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chrono::Utc;
use meeting_types::domain::{ChatFile, ChatMessage as ChatMessageDoc};
use meeting_types::MeetingStatus;
use serde::Deserialize;
use sqlx::PgPool;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, warn};
use uuid::Uuid;

use crate::events::{ChatSender, ClientEvent, ServerEvent, SignalPayload};
use crate::room::RoomRegistry;

#[derive(Clone)]
pub struct SignalingState {
    pub rooms: Arc<RoomRegistry>,
    pub tokens: Arc<token_verifier::TokenVerifier>,
    pub cache: Option<presence_cache::PresenceCache>,
    pub db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct HandshakeQuery {
    token: Option<String>,
}

/// `GET /ws?token=<bearer>`. A plain `WebSocket` can't carry the
/// `Authorization` header the REST side uses, so the handshake token rides
/// the query string — the wire-level stand-in for spec §6's
/// `{token}` socket.io handshake payload.
pub async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<SignalingState>,
    Query(query): Query<HandshakeQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        handle_socket(socket, state, query.token).await;
    })
}

struct Identity {
    user_id: String,
    username: String,
}

async fn authenticate(state: &SignalingState, token: Option<&str>) -> Option<Identity> {
    let token = token?;
    let claims = state.tokens.decode(token).ok()?;
    let user = meeting_repository::users::find_by_id(&state.db, &claims.sub)
        .await
        .ok()
        .flatten()?;
    let outcome = token_verifier::authenticate(&state.tokens, token, |_| Some(user.is_active));
    match outcome {
        token_verifier::AuthOutcome::Authenticated(identity) => Some(Identity {
            user_id: identity.user_id,
            username: identity.username,
        }),
        _ => None,
    }
}

async fn handle_socket(socket: WebSocket, state: SignalingState, token: Option<String>) {
    let Some(identity) = authenticate(&state, token.as_deref()).await else {
        close_unauthenticated(socket).await;
        return;
    };

    let socket_id = Uuid::new_v4().to_string();
    let (mut sink, mut stream) = futures::StreamExt::split(socket);
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let writer = tokio::spawn(async move {
        use futures::SinkExt;
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut current_meeting: Option<String> = None;

    use futures::StreamExt as _;
    while let Some(Ok(message)) = stream.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let event: ClientEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "dropping unrecognized socket event");
                continue;
            }
        };
        dispatch(&state, &socket_id, &identity, &mut current_meeting, event, &tx).await;
    }

    // Socket closed: leave whatever room it was in and notify the rest.
    if let Some(meeting_id) = current_meeting {
        on_disconnect(&state, &meeting_id, &socket_id, &identity).await;
    }
    writer.abort();
}

async fn close_unauthenticated(mut socket: WebSocket) {
    use futures::SinkExt;
    let event = ServerEvent::Error {
        message: "Authentication error".to_string(),
    };
    if let Ok(text) = serde_json::to_string(&event) {
        let _ = socket.send(Message::Text(text.into())).await;
    }
    let _ = socket.close().await;
}

async fn dispatch(
    state: &SignalingState,
    socket_id: &str,
    identity: &Identity,
    current_meeting: &mut Option<String>,
    event: ClientEvent,
    self_tx: &UnboundedSender<ServerEvent>,
) {
    match event {
        ClientEvent::JoinMeeting { meeting_id } => {
            on_join(state, socket_id, identity, &meeting_id, self_tx).await;
            *current_meeting = Some(meeting_id);
        }
        ClientEvent::LeaveMeeting { meeting_id } => {
            on_disconnect(state, &meeting_id, socket_id, identity).await;
            *current_meeting = None;
        }
        ClientEvent::Offer(payload) => route_signal(state, ServerEvent::Offer, identity, socket_id, payload),
        ClientEvent::Answer(payload) => route_signal(state, ServerEvent::Answer, identity, socket_id, payload),
        ClientEvent::IceCandidate(payload) => {
            route_signal(state, ServerEvent::IceCandidate, identity, socket_id, payload)
        }
        ClientEvent::ToggleAudio { meeting_id, audio_enabled } => {
            state.rooms.broadcast_all(
                &meeting_id,
                ServerEvent::AudioToggled {
                    meeting_id,
                    audio_enabled,
                    user_id: identity.user_id.clone(),
                },
            );
        }
        ClientEvent::ToggleVideo { meeting_id, video_enabled } => {
            state.rooms.broadcast_all(
                &meeting_id,
                ServerEvent::VideoToggled {
                    meeting_id,
                    video_enabled,
                    user_id: identity.user_id.clone(),
                },
            );
        }
        ClientEvent::ScreenShare { meeting_id, stream_id, active } => {
            state.rooms.broadcast_all(
                &meeting_id,
                ServerEvent::ScreenShare {
                    meeting_id,
                    stream_id,
                    active,
                    user_id: identity.user_id.clone(),
                },
            );
        }
        ClientEvent::RaiseHand { meeting_id, raised, user_id, username } => {
            state.rooms.broadcast_all(
                &meeting_id,
                ServerEvent::HandRaised {
                    meeting_id,
                    raised,
                    user_id: user_id.unwrap_or_else(|| identity.user_id.clone()),
                    username: username.unwrap_or_else(|| identity.username.clone()),
                },
            );
        }
        ClientEvent::Reaction { meeting_id, emoji } => {
            state.rooms.broadcast_all(
                &meeting_id,
                ServerEvent::Reaction {
                    meeting_id,
                    emoji,
                    user_id: identity.user_id.clone(),
                },
            );
        }
        ClientEvent::ChatMessage { meeting_id, message } => {
            on_chat_message(state, &meeting_id, identity, message).await;
        }
        ClientEvent::MuteParticipant { meeting_id, participant_id } => {
            if host_check(state, &meeting_id, &identity.user_id).await {
                state.rooms.send_to(
                    &meeting_id,
                    &participant_id,
                    ServerEvent::MutedByHost { meeting_id: meeting_id.clone() },
                );
            }
        }
        ClientEvent::RemoveParticipant { meeting_id, participant_id } => {
            if host_check(state, &meeting_id, &identity.user_id).await {
                state.rooms.send_to(
                    &meeting_id,
                    &participant_id,
                    ServerEvent::RemovedFromMeeting { meeting_id: meeting_id.clone() },
                );
            }
        }
    }
}

/// `join-meeting` (spec §4.F): existing members first receive `user-joined`,
/// then only the joiner receives `existing-participants` — the asymmetry
/// that lets the joiner initiate every offer and eliminates signaling glare.
async fn on_join(
    state: &SignalingState,
    socket_id: &str,
    identity: &Identity,
    meeting_id: &str,
    self_tx: &UnboundedSender<ServerEvent>,
) {
    if let Ok(Some(meeting)) = meeting_repository::meetings::find_by_meeting_id(&state.db, meeting_id).await {
        if meeting.status == MeetingStatus::Ended || meeting.status == MeetingStatus::Cancelled {
            let _ = self_tx.send(ServerEvent::Error {
                message: "meeting has ended or been cancelled".to_string(),
            });
            return;
        }
    }

    if let Some(cache) = &state.cache {
        let _ = cache.add_online_user(meeting_id, &identity.user_id, socket_id).await;
    }

    let existing = state
        .rooms
        .join(meeting_id, socket_id, &identity.user_id, &identity.username, self_tx.clone());

    state.rooms.broadcast_except(
        meeting_id,
        socket_id,
        ServerEvent::UserJoined {
            socket_id: socket_id.to_string(),
            user_id: identity.user_id.clone(),
            username: identity.username.clone(),
        },
    );
    state
        .rooms
        .send_to_socket(meeting_id, socket_id, ServerEvent::ExistingParticipants(existing));

    info!(meeting_id, user_id = %identity.user_id, "socket joined room");
}

async fn on_disconnect(state: &SignalingState, meeting_id: &str, socket_id: &str, identity: &Identity) {
    state.rooms.leave(meeting_id, socket_id);
    if let Some(cache) = &state.cache {
        let _ = cache.remove_online_user(meeting_id, &identity.user_id).await;
    }
    state.rooms.broadcast_except(
        meeting_id,
        socket_id,
        ServerEvent::UserLeft {
            socket_id: socket_id.to_string(),
            user_id: identity.user_id.clone(),
        },
    );
}

/// WebRTC signaling routing (spec §4.F): unicast when `to` is populated,
/// stamping `from`; legacy room-wide broadcast otherwise. The server never
/// inspects `data` and adds no deduplication of its own.
fn route_signal(
    state: &SignalingState,
    wrap: fn(SignalPayload) -> ServerEvent,
    identity: &Identity,
    sender_socket_id: &str,
    mut payload: SignalPayload,
) {
    payload.from = Some(identity.user_id.clone());
    let meeting_id = payload.meeting_id.clone();
    match payload.to.clone() {
        Some(to) => state.rooms.send_to(&meeting_id, &to, wrap(payload)),
        None => state.rooms.broadcast_except(&meeting_id, sender_socket_id, wrap(payload)),
    }
}

/// Chat over the socket path (spec §4.G): persist first, then broadcast to
/// the full room including the sender, so the broadcast doubles as a
/// durable receipt (spec §4.G, §9 open question resolved toward full-room
/// broadcast).
async fn on_chat_message(state: &SignalingState, meeting_id: &str, identity: &Identity, message: String) {
    let doc = ChatMessageDoc {
        id: Uuid::new_v4().to_string(),
        sender_id: identity.user_id.clone(),
        sender_username: identity.username.clone(),
        sender_avatar: None,
        message: message.clone(),
        kind: "text".to_string(),
        timestamp: Utc::now(),
        file: None,
    };

    if let Err(err) = meeting_repository::meetings::push_chat(&state.db, meeting_id, &doc).await {
        warn!(meeting_id, error = %err, "failed to persist chat message, broadcasting anyway");
    }

    state.rooms.broadcast_all(
        meeting_id,
        ServerEvent::ChatMessage {
            sender: ChatSender {
                id: doc.sender_id,
                username: doc.sender_username,
                avatar: doc.sender_avatar,
            },
            message: doc.message,
            kind: doc.kind,
            timestamp: doc.timestamp,
            file: doc.file.map(chat_file_json),
        },
    );
}

fn chat_file_json(file: ChatFile) -> serde_json::Value {
    serde_json::to_value(file).unwrap_or(serde_json::Value::Null)
}

/// Host check for `mute-participant` / `remove-participant` (spec §4.G:
/// "caller must pass host check (enforced at HTTP or here)").
async fn host_check(state: &SignalingState, meeting_id: &str, caller_id: &str) -> bool {
    match meeting_repository::meetings::find_by_meeting_id(&state.db, meeting_id).await {
        Ok(Some(meeting)) => meeting_state::is_host(&meeting, caller_id),
        _ => false,
    }
}
