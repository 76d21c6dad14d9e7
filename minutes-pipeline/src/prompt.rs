//! Structured prompt construction (spec §4.I step 1).

use chrono::{DateTime, Utc};
use meeting_types::domain::TranscriptSegment;
use meeting_types::minutes::Attendee;

pub struct PromptInputs<'a> {
    pub title: &'a str,
    pub date: DateTime<Utc>,
    pub duration_minutes: i64,
    pub attendees: &'a [Attendee],
    pub transcripts: &'a [TranscriptSegment],
}

/// Render the prompt sent to the LLM: title, date, duration, an attendee
/// table (`name | email | role`), and transcript lines formatted
/// `[<speaker>] (<HH:MM:SS>): <text>`.
pub fn build(inputs: &PromptInputs) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Meeting: {}\nDate: {}\nDuration: {} minutes\n\nAttendees (name | email | role):\n",
        inputs.title,
        inputs.date.format("%Y-%m-%d %H:%M UTC"),
        inputs.duration_minutes
    ));
    for a in inputs.attendees {
        out.push_str(&format!("{} | {} | {}\n", a.name, a.email, a.role));
    }
    out.push_str("\nTranscript:\n");
    for seg in inputs.transcripts {
        out.push_str(&format!(
            "[{}] ({}): {}\n",
            seg.speaker_name,
            format_hhmmss(seg.start_time_ms),
            seg.text
        ));
    }
    out.push_str(
        "\nReturn a single JSON object with keys: summary, agenda, discussionPoints, \
         decisions, actionItems, highlights, questionsRaised, followUps. \
         actionItems entries have {description, owner?, priority, deadline?}. \
         followUps entries have {description, owner?, deadline?}.",
    );
    out
}

fn format_hhmmss(start_time_ms: i64) -> String {
    let total_secs = start_time_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_timestamp_as_hhmmss() {
        assert_eq!(format_hhmmss(3_725_000), "01:02:05");
        assert_eq!(format_hhmmss(0), "00:00:00");
    }

    #[test]
    fn includes_attendee_table_and_instructions() {
        let inputs = PromptInputs {
            title: "Planning",
            date: Utc::now(),
            duration_minutes: 45,
            attendees: &[Attendee {
                user_id: "u1".into(),
                name: "Ada".into(),
                email: "ada@example.com".into(),
                role: "host".into(),
                joined_at: Utc::now(),
                left_at: None,
            }],
            transcripts: &[],
        };
        let prompt = build(&inputs);
        assert!(prompt.contains("Ada | ada@example.com | host"));
        assert!(prompt.contains("actionItems"));
    }
}
