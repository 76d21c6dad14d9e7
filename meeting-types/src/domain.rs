//! Persisted document shapes (spec §3 Data Model).
//!
//! These mirror the Meeting/User/Participant documents the repository reads
//! and writes. Nested collections (`participants`, `chat`, `transcripts`) are
//! stored as JSONB columns by `meeting-repository`; this crate only defines
//! their shape.

use chrono::{DateTime, Utc};
use rand::Rng as _;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    pub total_meetings: i64,
    pub meetings_hosted: i64,
    pub meetings_attended: i64,
    pub total_meeting_time_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mute_on_entry: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// `None` iff `is_guest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub is_guest: bool,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default)]
    pub statistics: UserStatistics,
    pub is_active: bool,
    pub last_seen_at: DateTime<Utc>,
}

impl User {
    /// Generate a unique guest username/email pair. Not cryptographically
    /// unique on its own; callers retry on a uniqueness-constraint conflict.
    pub fn synthesize_guest_identity() -> (String, String) {
        let suffix: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(6)
            .map(char::from)
            .collect::<String>()
            .to_lowercase();
        let id = uuid_like_suffix();
        (
            format!("Guest-{suffix}"),
            format!("guest-{id}@guests.local"),
        )
    }
}

fn uuid_like_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..12)
        .map(|_| {
            const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
            CHARSET[rng.gen_range(0..CHARSET.len())] as char
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Meeting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Scheduled,
    Ongoing,
    Ended,
    Cancelled,
}

impl MeetingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MeetingStatus::Ended | MeetingStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_true")]
    pub allow_guests: bool,
    #[serde(default)]
    pub require_password: bool,
    #[serde(default)]
    pub enable_recording: bool,
    #[serde(default = "default_true")]
    pub enable_chat: bool,
    #[serde(default = "default_true")]
    pub enable_screen_share: bool,
    #[serde(default = "default_true")]
    pub enable_raise_hand: bool,
    #[serde(default = "default_true")]
    pub enable_reactions: bool,
    #[serde(default = "default_max_participants")]
    pub max_participants: i32,
    #[serde(default)]
    pub waiting_room: bool,
    #[serde(default)]
    pub mute_on_entry: bool,
    #[serde(default)]
    pub video_on_entry: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_participants() -> i32 {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allow_guests: true,
            require_password: false,
            enable_recording: false,
            enable_chat: true,
            enable_screen_share: true,
            enable_raise_hand: true,
            enable_reactions: true,
            max_participants: default_max_participants(),
            waiting_room: false,
            mute_on_entry: false,
            video_on_entry: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    #[serde(rename = "co-host")]
    CoHost,
    Participant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Joined,
    Left,
    Removed,
    Invited,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    #[serde(default)]
    pub can_share: bool,
    #[serde(default)]
    pub can_record: bool,
    #[serde(default)]
    pub can_mute_others: bool,
    #[serde(default)]
    pub can_remove_others: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MediaState {
    #[serde(default)]
    pub audio_enabled: bool,
    #[serde(default)]
    pub video_enabled: bool,
    #[serde(default)]
    pub screen_sharing: bool,
    #[serde(default)]
    pub hand_raised: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_at: Option<DateTime<Utc>>,
    pub role: Role,
    pub status: ParticipantStatus,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub media_state: MediaState,
}

impl Participant {
    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    #[serde(default)]
    pub is_recording: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFile {
    pub url: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
    pub message: String,
    #[serde(rename = "type", default = "default_chat_type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<ChatFile>,
}

fn default_chat_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub speaker_id: String,
    pub speaker_name: String,
    /// Milliseconds from meeting start.
    pub start_time_ms: i64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MeetingStatistics {
    #[serde(default)]
    pub peak_participants: i32,
    #[serde(default)]
    pub total_participants: i32,
    #[serde(default)]
    pub chat_messages: i32,
    /// Minutes, set on `endMeeting`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<i64>,
}

/// The public-facing 9-alphanumeric meeting code, `XXX-XXX-XXX`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingId(String);

impl MeetingId {
    const CHARSET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Generate a candidate code. Callers are responsible for rejection
    /// sampling against the repository on a uniqueness conflict (spec §3).
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut group = || -> String {
            (0..3)
                .map(|_| Self::CHARSET[rng.gen_range(0..Self::CHARSET.len())] as char)
                .collect()
        };
        Self(format!("{}-{}-{}", group(), group(), group()))
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase();
        if Self::is_valid(&normalized) {
            Some(Self(normalized))
        } else {
            None
        }
    }

    pub fn is_valid(code: &str) -> bool {
        let bytes = code.as_bytes();
        if bytes.len() != 11 {
            return false;
        }
        for (i, b) in bytes.iter().enumerate() {
            let ok = if i == 3 || i == 7 {
                *b == b'-'
            } else {
                b.is_ascii_uppercase() || b.is_ascii_digit()
            };
            if !ok {
                return false;
            }
        }
        true
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MeetingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub meeting_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub host_user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: MeetingStatus,
    pub settings: Settings,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub recording: Recording,
    #[serde(default)]
    pub chat: Vec<ChatMessage>,
    #[serde(default)]
    pub transcripts: Vec<TranscriptSegment>,
    #[serde(default)]
    pub statistics: MeetingStatistics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    pub fn joined_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Joined)
    }

    pub fn joined_count(&self) -> usize {
        self.joined_participants().count()
    }

    pub fn find_participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn find_participant_mut(&mut self, user_id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.user_id == user_id)
    }

    pub fn current_host(&self) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.role == Role::Host && p.status == ParticipantStatus::Joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_meeting_id_matches_format() {
        for _ in 0..50 {
            let id = MeetingId::generate();
            assert!(MeetingId::is_valid(id.as_str()), "{}", id.as_str());
        }
    }

    #[test]
    fn parse_normalizes_case() {
        let id = MeetingId::parse("abc-123-xyz").expect("valid");
        assert_eq!(id.as_str(), "ABC-123-XYZ");
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(MeetingId::parse("ABC-123-XY").is_none());
        assert!(MeetingId::parse("ABC-123-XYZZ").is_none());
    }

    #[test]
    fn parse_rejects_missing_hyphens() {
        assert!(MeetingId::parse("ABC123XYZ12").is_none());
    }

    #[test]
    fn settings_defaults_match_spec() {
        let s = Settings::default();
        assert!(s.allow_guests);
        assert!(!s.require_password);
        assert_eq!(s.max_participants, 50);
        assert!(s.enable_chat);
    }

    #[test]
    fn guest_identity_is_marked_synthetic() {
        let (username, email) = User::synthesize_guest_identity();
        assert!(username.starts_with("Guest-"));
        assert!(email.starts_with("guest-"));
        assert!(email.ends_with("@guests.local"));
    }
}
