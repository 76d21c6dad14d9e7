//! Job queue payload shapes (spec §3 Job, §4.C).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueueName {
    Email,
    Reminder,
    MomGeneration,
    Recording,
}

impl QueueName {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueName::Email => "email",
            QueueName::Reminder => "reminder",
            QueueName::MomGeneration => "momGeneration",
            QueueName::Recording => "recording",
        }
    }

    /// Base exponential-backoff delay, spec §4.C.
    pub fn base_backoff_secs(self) -> u64 {
        match self {
            QueueName::Email => 5,
            QueueName::Reminder => 5,
            QueueName::MomGeneration => 10,
            QueueName::Recording => 5,
        }
    }

    /// Default attempt budget, spec §4.C.
    pub fn default_attempts(self) -> u32 {
        match self {
            QueueName::Email | QueueName::Reminder => 3,
            QueueName::MomGeneration | QueueName::Recording => 2,
        }
    }

    /// Worker pool size, spec §4.C.
    pub fn concurrency(self) -> usize {
        match self {
            QueueName::Email => 5,
            QueueName::Reminder => 3,
            QueueName::MomGeneration => 2,
            QueueName::Recording => 2,
        }
    }
}

/// Typed payload carried by a job. One variant per distinct unit of work the
/// pipeline dispatches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum JobPayload {
    MeetingReminder {
        meeting_id: String,
        user_id: String,
        time_label: String,
    },
    EmailMeetingReminder {
        meeting_id: String,
        recipient_email: String,
        recipient_name: String,
        meeting_title: String,
        scheduled_for: DateTime<Utc>,
        time_label: String,
    },
    EmailMeetingMinutes {
        meeting_id: String,
        recipient_email: String,
        recipient_name: String,
    },
    MomGeneration {
        meeting_id: String,
        requested_by: String,
    },
    RecordingPostProcess {
        meeting_id: String,
        recording_url: String,
    },
}

impl JobPayload {
    pub fn queue(&self) -> QueueName {
        match self {
            JobPayload::MeetingReminder { .. } => QueueName::Reminder,
            JobPayload::EmailMeetingReminder { .. } | JobPayload::EmailMeetingMinutes { .. } => {
                QueueName::Email
            }
            JobPayload::MomGeneration { .. } => QueueName::MomGeneration,
            JobPayload::RecordingPostProcess { .. } => QueueName::Recording,
        }
    }
}

/// A scheduled or immediate unit of work (spec §3 Job).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Deterministic for reminders (`reminder-<meetingId>-<minutesBefore>`),
    /// otherwise a random id. Used for idempotent enqueue and cancellation.
    pub id: String,
    pub payload: JobPayload,
    pub attempts_remaining: u32,
    pub not_before: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn reminder_id(meeting_id: &str, minutes_before: i64) -> String {
        format!("reminder-{meeting_id}-{minutes_before}")
    }

    pub fn immediate(id: String, payload: JobPayload) -> Self {
        let now = Utc::now();
        let attempts = payload.queue().default_attempts();
        Self {
            id,
            payload,
            attempts_remaining: attempts,
            not_before: now,
            created_at: now,
        }
    }

    pub fn scheduled(id: String, payload: JobPayload, not_before: DateTime<Utc>) -> Self {
        let attempts = payload.queue().default_attempts();
        Self {
            id,
            payload,
            attempts_remaining: attempts,
            not_before,
            created_at: Utc::now(),
        }
    }

    pub fn queue(&self) -> QueueName {
        self.payload.queue()
    }
}

/// The four canonical reminder lead times, in minutes (spec §1, §4.H).
pub const REMINDER_LADDER_MINUTES: [i64; 4] = [60, 30, 15, 5];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_id_is_deterministic() {
        assert_eq!(
            Job::reminder_id("ABC-123-XYZ", 30),
            "reminder-ABC-123-XYZ-30"
        );
    }

    #[test]
    fn queue_concurrency_matches_spec() {
        assert_eq!(QueueName::Email.concurrency(), 5);
        assert_eq!(QueueName::MomGeneration.concurrency(), 2);
        assert_eq!(QueueName::Recording.concurrency(), 2);
    }

    #[test]
    fn default_attempts_match_spec() {
        assert_eq!(QueueName::Email.default_attempts(), 3);
        assert_eq!(QueueName::Reminder.default_attempts(), 3);
        assert_eq!(QueueName::MomGeneration.default_attempts(), 2);
        assert_eq!(QueueName::Recording.default_attempts(), 2);
    }
}
