//! User-facing message formatting
//!
//! Builds replies for interactive lookups, change notifications and every
//! terminal error. Raw internal error text never reaches the user beyond a
//! short bounded excerpt.

use crate::config::MessageConfig;
use crate::model::{FetchOutcome, StatusEvent, TrackingResult};

/// Longest internal error excerpt shown to a user
pub const ERROR_EXCERPT_CHARS: usize = 80;

pub const START_TEXT: &str = "Hello 👋\n\
I look up J&T Express Vietnam parcel status for you.\n\n\
Usage:\n\
/check <tracking code> <last 4 phone digits>\n\
Example: /check 861396533622 6719\n\n\
Data is read directly from the official jtexpress.vn tracking page.";

pub const HELP_TEXT: &str = "Commands:\n\
/start - Introduction\n\
/help - Show this help\n\
/check <code> <last 4 phone digits> - Look up a parcel";

pub const USAGE_TEXT: &str = "Invalid syntax!\n\
Usage: /check <tracking code> <last 4 phone digits>\n\
Example: /check 861396533622 6719";

pub const NOT_FOUND_TEXT: &str = "No tracking information found.\n\
Check the tracking code and the last 4 phone digits, or try again later.";

pub const EMPTY_TEXT: &str = "No status updates were found for this order yet.";

pub const TIMEOUT_TEXT: &str = "The courier website did not respond in time.\n\
Please try again in a few minutes.";

const NO_DESCRIPTION: &str = "(no description)";

/// Overflow pointer when the tracking URL itself is too long to include
const SHORT_POINTER: &str = "\n\n... (long history, see the J&T Express website)";

/// One status line: `"<timestamp>: <description>"`
pub fn status_line(event: &StatusEvent) -> String {
    let description = if event.description.is_empty() {
        NO_DESCRIPTION
    } else {
        event.description.as_str()
    };

    if event.timestamp.is_empty() {
        description.to_string()
    } else {
        format!("{}: {}", event.timestamp, description)
    }
}

/// Reply text for an interactive lookup, whatever its outcome
pub fn format_reply(result: &TrackingResult, config: &MessageConfig) -> String {
    match &result.outcome {
        FetchOutcome::Success => {
            let header = format!("📦 Order: {}", result.query.billcode());
            format_status_list(&header, &result.events, &result.source_url, config)
        }
        FetchOutcome::Empty => EMPTY_TEXT.to_string(),
        FetchOutcome::NotFound => NOT_FOUND_TEXT.to_string(),
        FetchOutcome::Timeout => TIMEOUT_TEXT.to_string(),
        FetchOutcome::TransientError(detail) => format!(
            "Could not load the tracking page.\n\
             Please try again later or check the tracking code / phone digits.\n\
             (detail: {})",
            excerpt(detail, ERROR_EXCERPT_CHARS)
        ),
    }
}

/// Push text for a detected change: header plus the newest event
pub fn format_change_notification(result: &TrackingResult, config: &MessageConfig) -> String {
    let header = format!("🔔 New status for {}", result.query.billcode());
    let newest: Vec<StatusEvent> = result.latest().cloned().into_iter().collect();
    format_status_list(&header, &newest, &result.source_url, config)
}

/// Validation failure reply
pub fn format_validation_error(detail: &str) -> String {
    format!("{}\n\n{}", capitalize(detail), USAGE_TEXT)
}

/// Header plus one line per event, bounded by `config`
///
/// When the text exceeds `max_chars` it is cut on a character boundary and
/// a pointer to `source_url` is appended (without the URL when that would
/// take more than half the budget); the result never exceeds `max_chars`
/// characters.
pub fn format_status_list(
    header: &str,
    events: &[StatusEvent],
    source_url: &str,
    config: &MessageConfig,
) -> String {
    let limit = config.max_status_lines.unwrap_or(usize::MAX);

    let mut lines = vec![header.to_string()];
    lines.extend(events.iter().take(limit).map(status_line));
    let text = lines.join("\n");

    if text.chars().count() <= config.max_chars {
        return text;
    }

    let mut pointer = format!(
        "\n\n... (long history, see full details at: {})",
        source_url
    );
    // A URL that would crowd out the body is left out
    if pointer.chars().count() > config.max_chars / 2 {
        pointer = SHORT_POINTER.to_string();
    }

    let keep = config.max_chars.saturating_sub(pointer.chars().count());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(&pointer);
    truncated.chars().take(config.max_chars).collect()
}

/// First `max_chars` characters of `text`, with an ellipsis when cut
pub fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
