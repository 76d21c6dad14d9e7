//! Permission derivation (spec §4.E "Permission derivation").

use meeting_types::{Meeting, Role};

fn participant_of<'a>(meeting: &'a Meeting, user_id: &str) -> Option<&'a meeting_types::Participant> {
    meeting.participants.iter().find(|p| p.user_id == user_id)
}

/// `isHost`: `participant.role = host` OR `meeting.hostUserId = caller.id`.
pub fn is_host(meeting: &Meeting, user_id: &str) -> bool {
    meeting.host_user_id == user_id
        || participant_of(meeting, user_id).is_some_and(|p| p.role == Role::Host)
}

fn is_co_host(meeting: &Meeting, user_id: &str) -> bool {
    participant_of(meeting, user_id).is_some_and(|p| p.role == Role::CoHost)
}

/// `canRecord`: host, co-host, or the participant's own `permissions.canRecord`.
pub fn can_record(meeting: &Meeting, user_id: &str) -> bool {
    is_host(meeting, user_id)
        || is_co_host(meeting, user_id)
        || participant_of(meeting, user_id).is_some_and(|p| p.permissions.can_record)
}

/// `canChat`: host, or `settings.enableChat != false`.
pub fn can_chat(meeting: &Meeting, user_id: &str) -> bool {
    is_host(meeting, user_id) || meeting.settings.enable_chat
}

/// `canScreenShare`: host, co-host, or `settings.enableScreenShare != false`.
pub fn can_screen_share(meeting: &Meeting, user_id: &str) -> bool {
    is_host(meeting, user_id) || is_co_host(meeting, user_id) || meeting.settings.enable_screen_share
}

/// `canMuteOthers`: the participant's own permission, or host.
pub fn can_mute_others(meeting: &Meeting, user_id: &str) -> bool {
    is_host(meeting, user_id)
        || participant_of(meeting, user_id).is_some_and(|p| p.permissions.can_mute_others)
}

/// `canRemoveOthers`: the participant's own permission, or host.
pub fn can_remove_others(meeting: &Meeting, user_id: &str) -> bool {
    is_host(meeting, user_id)
        || participant_of(meeting, user_id).is_some_and(|p| p.permissions.can_remove_others)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meeting_types::{MediaState, Meeting, MeetingId, MeetingStatus, Participant, ParticipantStatus, Permissions, Settings};

    fn meeting_with(participants: Vec<Participant>) -> Meeting {
        Meeting {
            id: "m1".into(),
            meeting_id: MeetingId::generate().to_string(),
            title: "t".into(),
            description: None,
            host_user_id: "host-1".into(),
            password: None,
            scheduled_for: Utc::now(),
            duration_minutes: 30,
            status: MeetingStatus::Ongoing,
            settings: Settings::default(),
            participants,
            recording: Default::default(),
            chat: vec![],
            transcripts: vec![],
            statistics: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn participant(user_id: &str, role: Role) -> Participant {
        Participant {
            user_id: user_id.into(),
            joined_at: Utc::now(),
            left_at: None,
            role,
            status: ParticipantStatus::Joined,
            permissions: Permissions::default(),
            media_state: MediaState::default(),
        }
    }

    #[test]
    fn host_by_role_and_by_meeting_field_both_count() {
        let meeting = meeting_with(vec![participant("host-1", Role::Host)]);
        assert!(is_host(&meeting, "host-1"));
        assert!(!is_host(&meeting, "other"));
    }

    #[test]
    fn non_host_chat_blocked_when_disabled() {
        let mut meeting = meeting_with(vec![
            participant("host-1", Role::Host),
            participant("p-1", Role::Participant),
        ]);
        meeting.settings.enable_chat = false;
        assert!(!can_chat(&meeting, "p-1"));
        assert!(can_chat(&meeting, "host-1"));
    }

    #[test]
    fn co_host_can_screen_share_regardless_of_setting() {
        let mut meeting = meeting_with(vec![
            participant("host-1", Role::Host),
            participant("c-1", Role::CoHost),
        ]);
        meeting.settings.enable_screen_share = false;
        assert!(can_screen_share(&meeting, "c-1"));
    }
}
