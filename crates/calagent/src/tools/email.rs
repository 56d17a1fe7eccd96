use serde::Serialize;

use super::ToolOutcome;

/// Arguments of `draft_email`. The backend never sends mail; the model
/// writes the draft into its reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailDraft {
    pub to: Vec<String>,
    pub subject: String,
    pub context: String,
    pub tone: Option<String>,
}

const DEFAULT_TONE: &str = "friendly and professional";

pub fn compose(draft: &EmailDraft) -> ToolOutcome {
    let tone = draft.tone.as_deref().unwrap_or(DEFAULT_TONE);
    ToolOutcome::text(format!(
        "Write the email draft in your reply so the user can review and send it themselves. \
         Nothing has been sent.\nTo: {}\nSubject: {}\nTone: {tone}\nContext: {}\n\
         Keep it short, include any relevant event date and time exactly as listed, and sign off \
         without inventing a sender name.",
        draft.to.join(", "),
        draft.subject,
        draft.context,
    ))
}
