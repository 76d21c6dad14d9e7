//! Email templates (spec §4.J): `meeting-reminder`, `meeting-minutes`.
//! Rendered as plain HTML strings — no templating engine dependency beyond
//! `format!`, matching the scope of what this crate owns (rendering +
//! submission, not a general template system).

use chrono::{DateTime, Utc};

pub fn meeting_reminder(
    recipient_name: &str,
    meeting_title: &str,
    scheduled_for: DateTime<Utc>,
    time_label: &str,
    meeting_id: &str,
) -> (String, String) {
    let subject = format!("Reminder: \"{meeting_title}\" starts in {time_label}");
    let body = format!(
        "<p>Hi {recipient_name},</p>\
         <p>Your meeting <strong>{meeting_title}</strong> starts in {time_label}, \
         at {}.</p>\
         <p>Meeting code: <strong>{meeting_id}</strong></p>",
        scheduled_for.format("%Y-%m-%d %H:%M UTC"),
    );
    (subject, body)
}

pub fn meeting_minutes(
    recipient_name: &str,
    meeting_title: &str,
    summary: &str,
    meeting_id: &str,
) -> (String, String) {
    let subject = format!("Meeting minutes: \"{meeting_title}\"");
    let body = format!(
        "<p>Hi {recipient_name},</p>\
         <p>Minutes for <strong>{meeting_title}</strong> (code {meeting_id}) are ready.</p>\
         <p>{summary}</p>",
    );
    (subject, body)
}
