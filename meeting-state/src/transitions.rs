//! The meeting lifecycle state machine (spec §4.E).
//!
//! Every function here mutates a single `Meeting` in place and returns
//! either `Ok` or a domain `ApiError`. None of it touches storage —
//! `meeting-repository::meetings::update_atomic` is the caller's
//! read-modify-write wrapper, so a transition either fully applies to the
//! in-memory value or the caller discards it and retries.

use chrono::{DateTime, Utc};
use meeting_types::{
    ApiError, MediaState, Meeting, MeetingId, MeetingStatus, Participant, ParticipantStatus,
    Permissions, Role, Settings,
};

use crate::permissions::is_host;

fn find_mut<'a>(meeting: &'a mut Meeting, user_id: &str) -> Option<&'a mut Participant> {
    meeting.participants.iter_mut().find(|p| p.user_id == user_id)
}

fn bump_peak(meeting: &mut Meeting) {
    let joined = meeting.joined_count() as i32;
    if joined > meeting.statistics.peak_participants {
        meeting.statistics.peak_participants = joined;
    }
}

/// Build a brand new meeting with the host seeded as the first, already-joined
/// participant (spec §4.E `createMeeting`).
pub fn create_meeting(
    host_user_id: &str,
    title: String,
    description: Option<String>,
    duration_minutes: i32,
    settings: Settings,
) -> Meeting {
    let now = Utc::now();
    let host = Participant {
        user_id: host_user_id.to_string(),
        joined_at: now,
        left_at: None,
        role: Role::Host,
        status: ParticipantStatus::Joined,
        permissions: Permissions {
            can_share: true,
            can_record: true,
            can_mute_others: true,
            can_remove_others: true,
        },
        media_state: MediaState::default(),
    };
    let mut meeting = Meeting {
        id: uuid_string(),
        meeting_id: MeetingId::generate().to_string(),
        title,
        description,
        host_user_id: host_user_id.to_string(),
        password: None,
        scheduled_for: now,
        duration_minutes,
        status: MeetingStatus::Ongoing,
        settings,
        participants: vec![host],
        recording: Default::default(),
        chat: vec![],
        transcripts: vec![],
        statistics: Default::default(),
        created_at: now,
        updated_at: now,
    };
    bump_peak(&mut meeting);
    meeting
}

/// `scheduleMeeting`: requires `scheduledFor` strictly in the future; the
/// host is added as `{role: host, status: invited}` rather than joined.
pub fn schedule_meeting(
    host_user_id: &str,
    title: String,
    description: Option<String>,
    scheduled_for: DateTime<Utc>,
    duration_minutes: i32,
    settings: Settings,
) -> Result<Meeting, ApiError> {
    if scheduled_for <= Utc::now() {
        return Err(ApiError::bad_request("scheduledFor must be in the future"));
    }
    let now = Utc::now();
    let host = Participant {
        user_id: host_user_id.to_string(),
        joined_at: now,
        left_at: None,
        role: Role::Host,
        status: ParticipantStatus::Invited,
        permissions: Permissions {
            can_share: true,
            can_record: true,
            can_mute_others: true,
            can_remove_others: true,
        },
        media_state: MediaState::default(),
    };
    Ok(Meeting {
        id: uuid_string(),
        meeting_id: MeetingId::generate().to_string(),
        title,
        description,
        host_user_id: host_user_id.to_string(),
        password: None,
        scheduled_for,
        duration_minutes,
        status: MeetingStatus::Scheduled,
        settings,
        participants: vec![host],
        recording: Default::default(),
        chat: vec![],
        transcripts: vec![],
        statistics: Default::default(),
        created_at: now,
        updated_at: now,
    })
}

/// Whether the user's stats (`meetingsAttended`, `totalMeetings`) need
/// incrementing by the caller. Only true the first time this user ever
/// joins this meeting (spec §4.E step 6, and §8's idempotence property).
pub struct JoinOutcome {
    pub first_join: bool,
}

/// `joinMeeting` (spec §4.E). Mutates `meeting` in place; the caller is
/// responsible for incrementing `user.statistics` when `first_join` is true.
pub fn join_meeting(
    meeting: &mut Meeting,
    user_id: &str,
    password: Option<&str>,
) -> Result<JoinOutcome, ApiError> {
    if meeting.status.is_terminal() {
        return Err(ApiError::gone("meeting has ended or been cancelled"));
    }
    if meeting.settings.require_password {
        let matches = meeting
            .password
            .as_deref()
            .zip(password)
            .is_some_and(|(expected, given)| expected == given);
        if !matches {
            return Err(ApiError::unauthenticated("incorrect meeting password"));
        }
    }

    if let Some(existing_idx) = meeting.participants.iter().position(|p| p.user_id == user_id) {
        let already_joined = meeting.participants[existing_idx].status == ParticipantStatus::Joined;
        if !already_joined && meeting.joined_count() >= meeting.settings.max_participants as usize
        {
            return Err(ApiError::resource_exhausted("meeting is full"));
        }
        let p = &mut meeting.participants[existing_idx];
        if already_joined {
            if meeting.status == MeetingStatus::Scheduled {
                meeting.status = MeetingStatus::Ongoing;
            }
            bump_peak(meeting);
            return Ok(JoinOutcome { first_join: false });
        }
        p.status = ParticipantStatus::Joined;
        p.joined_at = Utc::now();
        p.left_at = None;
        if meeting.status == MeetingStatus::Scheduled {
            meeting.status = MeetingStatus::Ongoing;
        }
        bump_peak(meeting);
        return Ok(JoinOutcome { first_join: false });
    }

    if meeting.joined_count() >= meeting.settings.max_participants as usize {
        return Err(ApiError::resource_exhausted("meeting is full"));
    }

    meeting.participants.push(Participant {
        user_id: user_id.to_string(),
        joined_at: Utc::now(),
        left_at: None,
        role: Role::Participant,
        status: ParticipantStatus::Joined,
        permissions: Permissions::default(),
        media_state: MediaState::default(),
    });
    if meeting.status == MeetingStatus::Scheduled {
        meeting.status = MeetingStatus::Ongoing;
    }
    bump_peak(meeting);
    Ok(JoinOutcome { first_join: true })
}

/// `leaveMeeting` with host succession (spec §4.E). Returns the new host's
/// user id when succession happened, so the caller can notify the room.
pub fn leave_meeting(meeting: &mut Meeting, user_id: &str) -> Result<Option<String>, ApiError> {
    let Some(idx) = meeting.participants.iter().position(|p| p.user_id == user_id) else {
        return Err(ApiError::not_found("not a participant of this meeting"));
    };
    if meeting.participants[idx].status != ParticipantStatus::Joined {
        return Err(ApiError::failed_precondition("participant already left"));
    }

    let was_host = meeting.participants[idx].role == Role::Host;
    meeting.participants[idx].status = ParticipantStatus::Left;
    meeting.participants[idx].left_at = Some(Utc::now());

    meeting.statistics.total_participants = meeting.joined_count() as i32;

    let mut succeeded_by = None;
    if was_host {
        let co_host_idx = meeting
            .participants
            .iter()
            .position(|p| p.status == ParticipantStatus::Joined && p.role == Role::CoHost);
        let successor_idx = co_host_idx.or_else(|| {
            meeting
                .participants
                .iter()
                .enumerate()
                .filter(|(_, p)| p.status == ParticipantStatus::Joined)
                .min_by_key(|(_, p)| p.joined_at)
                .map(|(i, _)| i)
        });

        if let Some(successor_idx) = successor_idx {
            meeting.participants[idx].role = Role::Participant;
            meeting.participants[successor_idx].role = Role::Host;
            meeting.host_user_id = meeting.participants[successor_idx].user_id.clone();
            succeeded_by = Some(meeting.host_user_id.clone());
        }
    }

    if meeting.joined_count() == 0 {
        meeting.status = MeetingStatus::Ended;
        meeting.statistics.total_duration =
            Some((Utc::now() - meeting.scheduled_for).num_seconds() / 60);
    }

    Ok(succeeded_by)
}

/// `endMeeting`, host only (spec §4.E).
pub fn end_meeting(meeting: &mut Meeting, caller_id: &str) -> Result<(), ApiError> {
    if meeting.status.is_terminal() {
        return Err(ApiError::failed_precondition("meeting already ended"));
    }
    if !is_host(meeting, caller_id) {
        return Err(ApiError::forbidden("only the host can end the meeting"));
    }
    meeting.status = MeetingStatus::Ended;
    meeting.statistics.total_duration =
        Some((Utc::now() - meeting.scheduled_for).num_seconds() / 60);
    for p in meeting.participants.iter_mut() {
        if p.status == ParticipantStatus::Joined {
            p.status = ParticipantStatus::Left;
            p.left_at = Some(Utc::now());
        }
    }
    Ok(())
}

/// `cancelMeeting`, host only, only from `scheduled` (spec §4.E).
pub fn cancel_meeting(meeting: &mut Meeting, caller_id: &str) -> Result<(), ApiError> {
    if !is_host(meeting, caller_id) {
        return Err(ApiError::forbidden("only the host can cancel the meeting"));
    }
    if meeting.status != MeetingStatus::Scheduled {
        return Err(ApiError::failed_precondition(
            "only a scheduled meeting can be cancelled",
        ));
    }
    meeting.status = MeetingStatus::Cancelled;
    Ok(())
}

/// `updateMeetingSettings`, host only, shallow-merge (spec §4.E).
pub fn update_settings(
    meeting: &mut Meeting,
    caller_id: &str,
    patch: SettingsPatch,
) -> Result<(), ApiError> {
    if !is_host(meeting, caller_id) {
        return Err(ApiError::forbidden("only the host can change settings"));
    }
    patch.apply_to(&mut meeting.settings);
    Ok(())
}

/// Partial update for `Settings`; only `Some` fields are applied, matching
/// the "shallow-merge supplied keys" rule (spec §4.E, SPEC_FULL §C).
#[derive(Debug, Default, Clone)]
pub struct SettingsPatch {
    pub allow_guests: Option<bool>,
    pub require_password: Option<bool>,
    pub enable_recording: Option<bool>,
    pub enable_chat: Option<bool>,
    pub enable_screen_share: Option<bool>,
    pub enable_raise_hand: Option<bool>,
    pub enable_reactions: Option<bool>,
    pub max_participants: Option<i32>,
    pub waiting_room: Option<bool>,
    pub mute_on_entry: Option<bool>,
    pub video_on_entry: Option<bool>,
}

impl SettingsPatch {
    fn apply_to(self, settings: &mut Settings) {
        if let Some(v) = self.allow_guests {
            settings.allow_guests = v;
        }
        if let Some(v) = self.require_password {
            settings.require_password = v;
        }
        if let Some(v) = self.enable_recording {
            settings.enable_recording = v;
        }
        if let Some(v) = self.enable_chat {
            settings.enable_chat = v;
        }
        if let Some(v) = self.enable_screen_share {
            settings.enable_screen_share = v;
        }
        if let Some(v) = self.enable_raise_hand {
            settings.enable_raise_hand = v;
        }
        if let Some(v) = self.enable_reactions {
            settings.enable_reactions = v;
        }
        if let Some(v) = self.max_participants {
            settings.max_participants = v;
        }
        if let Some(v) = self.waiting_room {
            settings.waiting_room = v;
        }
        if let Some(v) = self.mute_on_entry {
            settings.mute_on_entry = v;
        }
        if let Some(v) = self.video_on_entry {
            settings.video_on_entry = v;
        }
    }
}

fn uuid_string() -> String {
    // Internal document id, distinct from the public meetingId. A full UUID
    // crate dependency lives one level up (meeting-repository); this crate
    // stays framework-free, so it borrows the same alphanumeric generator
    // `MeetingId` uses rather than pulling in `uuid` here too.
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..24)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn create_meeting_seeds_host_as_joined() {
        let meeting = create_meeting("host-1", "Standup".into(), None, 30, settings());
        assert_eq!(meeting.status, MeetingStatus::Ongoing);
        assert_eq!(meeting.participants.len(), 1);
        assert_eq!(meeting.participants[0].role, Role::Host);
        assert_eq!(meeting.participants[0].status, ParticipantStatus::Joined);
        assert_eq!(meeting.statistics.peak_participants, 1);
    }

    #[test]
    fn schedule_meeting_rejects_past_time() {
        let past = Utc::now() - chrono::Duration::hours(1);
        let err = schedule_meeting("host-1", "t".into(), None, past, 30, settings()).unwrap_err();
        assert_eq!(err.kind, meeting_types::ErrorKind::BadRequest);
    }

    #[test]
    fn join_then_join_is_idempotent() {
        let mut meeting = create_meeting("host-1", "t".into(), None, 30, settings());
        let outcome = join_meeting(&mut meeting, "p-1", None).unwrap();
        assert!(outcome.first_join);
        assert_eq!(meeting.joined_count(), 2);

        let outcome2 = join_meeting(&mut meeting, "p-1", None).unwrap();
        assert!(!outcome2.first_join);
        assert_eq!(meeting.joined_count(), 2);
    }

    #[test]
    fn join_leave_join_resets_joined_at_without_double_counting() {
        let mut meeting = create_meeting("host-1", "t".into(), None, 30, settings());
        join_meeting(&mut meeting, "p-1", None).unwrap();
        leave_meeting(&mut meeting, "p-1").unwrap();
        let outcome = join_meeting(&mut meeting, "p-1", None).unwrap();
        assert!(!outcome.first_join);
        assert_eq!(
            meeting.find_participant("p-1").unwrap().status,
            ParticipantStatus::Joined
        );
    }

    #[test]
    fn join_full_meeting_fails_resource_exhausted() {
        let mut settings = settings();
        settings.max_participants = 1;
        let mut meeting = create_meeting("host-1", "t".into(), None, 30, settings);
        let err = join_meeting(&mut meeting, "p-1", None).unwrap_err();
        assert_eq!(err.kind, meeting_types::ErrorKind::ResourceExhausted);
        assert_eq!(meeting.joined_count(), 1);
    }

    #[test]
    fn join_terminal_meeting_fails_gone() {
        let mut meeting = create_meeting("host-1", "t".into(), None, 30, settings());
        meeting.status = MeetingStatus::Ended;
        let err = join_meeting(&mut meeting, "p-1", None).unwrap_err();
        assert_eq!(err.kind, meeting_types::ErrorKind::Gone);
    }

    #[test]
    fn host_succession_prefers_co_host_over_oldest_participant() {
        let mut meeting = create_meeting("host-1", "t".into(), None, 30, settings());
        join_meeting(&mut meeting, "p-early", None).unwrap();
        join_meeting(&mut meeting, "c-1", None).unwrap();
        meeting.find_participant_mut("c-1").unwrap().role = Role::CoHost;

        let new_host = leave_meeting(&mut meeting, "host-1").unwrap();
        assert_eq!(new_host.as_deref(), Some("c-1"));
        assert_eq!(meeting.host_user_id, "c-1");
        assert_eq!(meeting.status, MeetingStatus::Ongoing);
        assert_eq!(
            meeting.find_participant("host-1").unwrap().role,
            Role::Participant
        );
    }

    #[test]
    fn last_leaver_ends_the_meeting() {
        let mut meeting = create_meeting("host-1", "t".into(), None, 30, settings());
        let new_host = leave_meeting(&mut meeting, "host-1").unwrap();
        assert!(new_host.is_none());
        assert_eq!(meeting.status, MeetingStatus::Ended);
        assert!(meeting.statistics.total_duration.is_some());
    }

    #[test]
    fn end_meeting_requires_host() {
        let mut meeting = create_meeting("host-1", "t".into(), None, 30, settings());
        join_meeting(&mut meeting, "p-1", None).unwrap();
        let err = end_meeting(&mut meeting, "p-1").unwrap_err();
        assert_eq!(err.kind, meeting_types::ErrorKind::Forbidden);
        assert!(end_meeting(&mut meeting, "host-1").is_ok());
        assert_eq!(meeting.status, MeetingStatus::Ended);
    }

    #[test]
    fn cancel_requires_scheduled_status() {
        let mut meeting = create_meeting("host-1", "t".into(), None, 30, settings());
        let err = cancel_meeting(&mut meeting, "host-1").unwrap_err();
        assert_eq!(err.kind, meeting_types::ErrorKind::FailedPrecondition);
    }

    #[test]
    fn update_settings_is_shallow_merge() {
        let mut meeting = create_meeting("host-1", "t".into(), None, 30, settings());
        let patch = SettingsPatch {
            enable_chat: Some(false),
            ..Default::default()
        };
        update_settings(&mut meeting, "host-1", patch).unwrap();
        assert!(!meeting.settings.enable_chat);
        assert!(meeting.settings.enable_screen_share);
    }
}
