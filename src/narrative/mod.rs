/*!
Narrative analysis of session events.

An external text service can be asked to explain the session's last event.
The service is optional: it may be missing, misconfigured or unreachable, and
none of that ever reaches the session state machine. [`summarize`] always
returns displayable text, falling back to a fixed message for each failure.
*/

pub mod prompt;

#[cfg(feature = "gemini")]
pub mod gemini;

use crate::core::error::{NarrativeError, Result};
use crate::core::session::LastEvent;

pub use self::prompt::build_prompt;

#[cfg(feature = "gemini")]
pub use self::gemini::GeminiNarrator;

/// Shown when no credential is configured
pub const MISSING_CREDENTIAL_TEXT: &str =
    "Gemini API key not configured. Please add GEMINI_API_KEY to your environment variables.";

/// Shown when the service cannot be reached or answers with an error
pub const SERVICE_FAILURE_TEXT: &str =
    "Error calling Gemini API. Please check your connection and API key.";

/// Shown when the service answers without text
pub const EMPTY_RESPONSE_TEXT: &str = "Could not get analysis from Gemini.";

/// Shown before any operation has run
pub const NO_EVENT_TEXT: &str = "No event to analyze yet.";

/// A text service that can explain a prompt
pub trait Narrator {
    /// Send `prompt` and return the service's answer
    fn explain(&self, prompt: &str) -> std::result::Result<String, NarrativeError>;
}

impl<N: Narrator + ?Sized> Narrator for &N {
    fn explain(&self, prompt: &str) -> std::result::Result<String, NarrativeError> {
        (**self).explain(prompt)
    }
}

impl<N: Narrator + ?Sized> Narrator for Box<N> {
    fn explain(&self, prompt: &str) -> std::result::Result<String, NarrativeError> {
        (**self).explain(prompt)
    }
}

/// Ask `narrator` to explain `event`
pub fn explain_event(narrator: &dyn Narrator, event: &LastEvent) -> Result<String> {
    let prompt = build_prompt(event);
    log::debug!("Requesting analysis of {} event", event.kind.as_str());
    Ok(narrator.explain(&prompt)?)
}

/// Explain the last event, or the fallback text for whatever went wrong
pub fn summarize(narrator: Option<&dyn Narrator>, event: Option<&LastEvent>) -> String {
    let Some(event) = event else {
        return NO_EVENT_TEXT.to_string();
    };
    let Some(narrator) = narrator else {
        log::warn!("No narrative service configured");
        return MISSING_CREDENTIAL_TEXT.to_string();
    };

    match narrator.explain(&build_prompt(event)) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => fallback_text(&NarrativeError::EmptyResponse).to_string(),
        Err(err) => {
            log::warn!("Narrative service failed: {}", err);
            fallback_text(&err).to_string()
        }
    }
}

/// Fixed text shown for a narrative failure
pub fn fallback_text(err: &NarrativeError) -> &'static str {
    match err {
        NarrativeError::MissingCredential => MISSING_CREDENTIAL_TEXT,
        NarrativeError::EmptyResponse => EMPTY_RESPONSE_TEXT,
        NarrativeError::Transport(_) | NarrativeError::HttpStatus(_) | NarrativeError::Decode(_) => {
            SERVICE_FAILURE_TEXT
        }
    }
}
