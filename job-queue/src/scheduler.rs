//! Scheduler (spec §4.H): a thin client of the job queue that computes
//! reminder `notBefore` times and submits/cancels them by deterministic ID.

use chrono::Utc;
use meeting_types::{Job, JobPayload, Meeting, QueueName, REMINDER_LADDER_MINUTES};

use crate::error::QueueError;
use crate::queue::JobQueue;

/// Enqueue one reminder job per interval in `{60, 30, 15, 5}` minutes before
/// `meeting.scheduledFor` whose resulting `notBefore` is still in the
/// future. Each job's ID is `reminder-<meetingId>-<minutes>` so repeated
/// scheduling is idempotent.
pub async fn schedule_reminders(
    queue: &JobQueue,
    meeting: &Meeting,
    user_id: &str,
) -> Result<usize, QueueError> {
    let mut scheduled = 0;
    for &minutes in REMINDER_LADDER_MINUTES.iter() {
        let not_before = meeting.scheduled_for - chrono::Duration::minutes(minutes);
        if not_before <= Utc::now() {
            continue;
        }
        let id = Job::reminder_id(&meeting.meeting_id, minutes);
        let payload = JobPayload::MeetingReminder {
            meeting_id: meeting.meeting_id.clone(),
            user_id: user_id.to_string(),
            time_label: time_label(minutes),
        };
        queue.enqueue(Job::scheduled(id, payload, not_before)).await?;
        scheduled += 1;
    }
    Ok(scheduled)
}

/// Remove all four reminder job IDs for a meeting (spec §4.H, called from
/// `cancelMeeting`).
pub async fn cancel_reminders(queue: &JobQueue, meeting_id: &str) -> Result<(), QueueError> {
    for &minutes in REMINDER_LADDER_MINUTES.iter() {
        let id = Job::reminder_id(meeting_id, minutes);
        queue.cancel(QueueName::Reminder, &id).await?;
    }
    Ok(())
}

fn time_label(minutes: i64) -> String {
    if minutes >= 60 {
        format!("{} hour", minutes / 60)
    } else {
        format!("{minutes} minutes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meeting_types::{MediaState, MeetingStatus, Participant, ParticipantStatus, Permissions, Role, Settings};

    fn meeting_in(minutes_from_now: i64) -> Meeting {
        let now = Utc::now();
        Meeting {
            id: "m1".into(),
            meeting_id: "ABC-123-XYZ".into(),
            title: "t".into(),
            description: None,
            host_user_id: "host-1".into(),
            password: None,
            scheduled_for: now + chrono::Duration::minutes(minutes_from_now),
            duration_minutes: 30,
            status: MeetingStatus::Scheduled,
            settings: Settings::default(),
            participants: vec![Participant {
                user_id: "host-1".into(),
                joined_at: now,
                left_at: None,
                role: Role::Host,
                status: ParticipantStatus::Invited,
                permissions: Permissions::default(),
                media_state: MediaState::default(),
            }],
            recording: Default::default(),
            chat: vec![],
            transcripts: vec![],
            statistics: Default::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn schedules_only_future_reminders() {
        let queue = JobQueue::in_memory();
        let meeting = meeting_in(20);
        let scheduled = schedule_reminders(&queue, &meeting, "host-1").await.unwrap();
        // Only the 15 and 5 minute marks are still in the future at T+20.
        assert_eq!(scheduled, 2);
    }

    #[tokio::test]
    async fn cancel_reminders_is_a_no_op_on_empty_queue() {
        let queue = JobQueue::in_memory();
        assert!(cancel_reminders(&queue, "ABC-123-XYZ").await.is_ok());
    }
}
