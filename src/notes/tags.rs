//! `[Orik]` tag extraction from speaker notes

/// The annotation marker authors embed in speaker notes
pub const TAG_MARKER: &str = "[orik]";

/// Extract `[Orik]`-tagged content spans from raw speaker notes.
///
/// The marker match is case-insensitive. Each span runs from the end of a
/// marker up to the next `[` or the end of the string, across line breaks.
/// Spans are trimmed; empty spans are dropped.
#[must_use]
pub fn extract(notes: &str) -> Vec<String> {
    let mut spans = Vec::new();
    let mut search_from = 0;

    while let Some(rel) = find_marker(&notes[search_from..]) {
        let start = search_from + rel + TAG_MARKER.len();

        // Span ends at the next bracket (another tag) or end of string
        let end = notes[start..]
            .find('[')
            .map_or(notes.len(), |next| start + next);

        let span = notes[start..end].trim();
        if !span.is_empty() {
            spans.push(span.to_string());
        }

        search_from = end;
    }

    spans
}

/// Byte offset of the first case-insensitive marker occurrence, if any
fn find_marker(haystack: &str) -> Option<usize> {
    let needle = TAG_MARKER.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}
