//! Status extractor
//!
//! Pure mapping from parsed page entries to [`StatusEvent`]s. Source order
//! is preserved: the provider lists the newest milestone first and nothing
//! here re-sorts.

use crate::markup::{FieldLabel, MarkupProfile, ParsedEntry};
use crate::model::{RawContent, StatusEvent};

/// Extract status events from fetched page content
///
/// An existing but empty status list yields an empty vector, not an error.
pub fn extract(content: &RawContent, profile: &MarkupProfile) -> Vec<StatusEvent> {
    events_from_entries(&profile.parse(&content.html).entries)
}

/// Map entries to events, in order
///
/// - timestamp: `"<date> <time>"`, empty unless both fields are present
/// - description: the entry's description, possibly empty
/// - an entry with neither a timestamp nor a description is skipped
pub fn events_from_entries(entries: &[ParsedEntry]) -> Vec<StatusEvent> {
    entries.iter().filter_map(event_from_entry).collect()
}

fn event_from_entry(entry: &ParsedEntry) -> Option<StatusEvent> {
    let timestamp = match (entry.get(FieldLabel::Date), entry.get(FieldLabel::Time)) {
        (Some(date), Some(time)) => format!("{} {}", date, time),
        _ => String::new(),
    };
    let description = entry.get(FieldLabel::Description).unwrap_or_default();

    if timestamp.is_empty() && description.is_empty() {
        return None;
    }

    Some(StatusEvent::new(timestamp, description))
}
