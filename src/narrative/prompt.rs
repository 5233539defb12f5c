//! Prompt text for the narrative service.

use crate::core::session::LastEvent;

/// Build the analysis prompt for an event
pub fn build_prompt(event: &LastEvent) -> String {
    format!(
        "As a quantum security expert, briefly explain the last event in a vehicle-to-vehicle QKD simulation.\n\
         Event Type: {}\n\
         Details: {}\n\
         Explain its significance for establishing a secure key. If an eavesdropper was detected, explain how.",
        event.kind.as_str(),
        event.details
    )
}
