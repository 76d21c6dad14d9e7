//! Minutes pipeline (spec §4.I): build a structured prompt from attendees
//! and transcripts, call the LLM, normalize the response into
//! `meeting-types::MeetingMinutes`. Runs either on a `job-queue` worker or
//! synchronously from the "end meeting" HTTP flow with a longer timeout.

pub mod error;
pub mod llm;
pub mod normalize;
pub mod prompt;

pub use error::PipelineError;
pub use llm::LlmClient;

use chrono::{DateTime, Utc};
use meeting_types::minutes::{AiProcessing, Attendee, EmailDelivery, MinutesStatus};
use meeting_types::MeetingMinutes;

const MODEL_NAME: &str = "gemini-1.5-flash";
const CONFIDENCE: f32 = 0.85;

pub struct GenerateMinutesInput<'a> {
    pub meeting_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    pub attendees: Vec<Attendee>,
    pub transcripts: &'a [meeting_types::domain::TranscriptSegment],
}

/// Run the whole pipeline end to end and return a fully-populated
/// `MeetingMinutes`, either `status = completed` or, on a parse failure,
/// `status = failed` with a degraded body (spec §4.I step 3: "do not throw
/// to the caller for the email step").
pub async fn generate(llm: &LlmClient, input: GenerateMinutesInput<'_>) -> MeetingMinutes {
    let transcript_lines: Vec<String> = input
        .transcripts
        .iter()
        .map(|seg| format!("[{}] {}", seg.speaker_name, seg.text))
        .collect();

    let prompt_inputs = prompt::PromptInputs {
        title: &input.title,
        date: input.start_time,
        duration_minutes: input.duration_minutes,
        attendees: &input.attendees,
        transcripts: input.transcripts,
    };
    let rendered_prompt = prompt::build(&prompt_inputs);

    match llm.generate_minutes(&rendered_prompt).await {
        Ok(result) => {
            let parsed = normalize::normalize(&result.raw_json);
            MeetingMinutes {
                meeting_id: input.meeting_id,
                title: input.title,
                date: input.start_time.date_naive(),
                start_time: input.start_time,
                end_time: input.end_time,
                duration_minutes: input.duration_minutes,
                attendees: input.attendees,
                agenda: parsed.agenda,
                transcripts: transcript_lines,
                summary: parsed.summary,
                discussion_points: parsed.discussion_points,
                decisions: parsed.decisions,
                action_items: parsed.action_items,
                highlights: parsed.highlights,
                questions_raised: parsed.questions_raised,
                follow_ups: parsed.follow_ups,
                ai_processing: Some(AiProcessing {
                    model: MODEL_NAME.to_string(),
                    processed_at: Utc::now(),
                    tokens_used: result.tokens_used,
                    confidence: CONFIDENCE,
                }),
                email_delivery: EmailDelivery::default(),
                status: MinutesStatus::Completed,
                error: None,
            }
        }
        Err(err) => {
            tracing::warn!(meeting_id = %input.meeting_id, error = %err, "minutes generation failed, persisting degraded record");
            let degraded = normalize::degraded(&err.to_string());
            MeetingMinutes {
                meeting_id: input.meeting_id,
                title: input.title,
                date: input.start_time.date_naive(),
                start_time: input.start_time,
                end_time: input.end_time,
                duration_minutes: input.duration_minutes,
                attendees: input.attendees,
                agenda: degraded.agenda,
                transcripts: transcript_lines,
                summary: degraded.summary,
                discussion_points: degraded.discussion_points,
                decisions: degraded.decisions,
                action_items: degraded.action_items,
                highlights: degraded.highlights,
                questions_raised: degraded.questions_raised,
                follow_ups: degraded.follow_ups,
                ai_processing: None,
                email_delivery: EmailDelivery::default(),
                status: MinutesStatus::Failed,
                error: Some(err.to_string()),
            }
        }
    }
}
