//! Shared defaults and small helpers.

/// Default system instruction for the real-estate assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly real estate assistant for properties and companies in Addis Ababa. \
Use the search tools to look up listings, companies and platform information before answering. \
Lead with the most relevant details (title, price, location with subcity and coordinates when available), \
give full details unless the user asks for a summary, say clearly when results come from a nearby area, \
and finish by asking whether the user needs anything else.";

/// Shorten `text` to at most `max_chars` characters for log output.
#[must_use]
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
