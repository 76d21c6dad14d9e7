//! Stateless email renderer + SMTP submission (spec §4.J). Each send result
//! is `{email, status, sentAt, error?}`, meant to be folded directly into a
//! `MeetingMinutes.emailDelivery.recipients` entry by the caller.

pub mod error;
pub mod templates;

pub use error::EmailError;

use chrono::Utc;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use meeting_types::minutes::{RecipientDelivery, RecipientStatus};

#[derive(Clone)]
pub struct EmailDispatcher {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl EmailDispatcher {
    pub fn new(host: &str, username: &str, password: &str, from: &str) -> Result<Self, EmailError> {
        let creds = Credentials::new(username.to_string(), password.to_string());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            .credentials(creds)
            .build();
        Ok(Self {
            transport,
            from: from.to_string(),
        })
    }

    async fn send_one(&self, to: &str, subject: &str, html_body: &str) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(lettre::message::header::ContentType::TEXT_HTML)
            .body(html_body.to_string())?;

        self.transport.send(message).await?;
        Ok(())
    }

    /// Submit one `meeting-reminder` email and return its delivery record.
    pub async fn send_meeting_reminder(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        meeting_title: &str,
        scheduled_for: chrono::DateTime<Utc>,
        time_label: &str,
        meeting_id: &str,
    ) -> RecipientDelivery {
        let (subject, body) = templates::meeting_reminder(
            recipient_name,
            meeting_title,
            scheduled_for,
            time_label,
            meeting_id,
        );
        self.record_send(recipient_email, &subject, &body).await
    }

    /// Submit one `meeting-minutes` email and return its delivery record.
    pub async fn send_meeting_minutes(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        meeting_title: &str,
        summary: &str,
        meeting_id: &str,
    ) -> RecipientDelivery {
        let (subject, body) = templates::meeting_minutes(recipient_name, meeting_title, summary, meeting_id);
        self.record_send(recipient_email, &subject, &body).await
    }

    async fn record_send(&self, to: &str, subject: &str, body: &str) -> RecipientDelivery {
        match self.send_one(to, subject, body).await {
            Ok(()) => RecipientDelivery {
                email: to.to_string(),
                status: RecipientStatus::Sent,
                sent_at: Some(Utc::now()),
                error: None,
            },
            Err(e) => {
                tracing::warn!(to = %to, error = %e, "email send failed");
                RecipientDelivery {
                    email: to.to_string(),
                    status: RecipientStatus::Failed,
                    sent_at: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::templates::*;
    use chrono::Utc;

    #[test]
    fn reminder_template_includes_time_label_and_code() {
        let (subject, body) = meeting_reminder("Ada", "Standup", Utc::now(), "15 minutes", "ABC-123-XYZ");
        assert!(subject.contains("15 minutes"));
        assert!(body.contains("ABC-123-XYZ"));
    }

    #[test]
    fn minutes_template_includes_summary() {
        let (subject, body) = meeting_minutes("Ada", "Standup", "We shipped it.", "ABC-123-XYZ");
        assert!(subject.contains("Standup"));
        assert!(body.contains("We shipped it."));
    }
}
