//! Delivery shaping for sarcastic speech
//!
//! Hosted TTS engines flatten dry sarcasm unless the text itself carries the
//! timing. This pass inserts beats after interjections and stretches
//! ellipses so the rendered line lands the way it reads.

use std::sync::LazyLock;

use regex::Regex;

/// Interjections that want a beat after them
static INTERJECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(oh|well|sure|wow|ah)\b([ ,])").unwrap_or_else(|e| {
        unreachable!("interjection pattern is static: {e}")
    })
});

/// Collapsed or spaced ellipsis variants
static ELLIPSIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.{3,}\s*").unwrap_or_else(|e| unreachable!("ellipsis pattern is static: {e}"))
});

/// Shape a line for sarcastic delivery.
///
/// Interjections (`Oh`, `Well`, `Sure`, ...) get a trailing pause and
/// ellipses become a full stop-and-drawl. Idempotent: shaping shaped text
/// changes nothing.
#[must_use]
pub fn shape_delivery(text: &str) -> String {
    let text = ELLIPSIS.replace_all(text, "... ");
    let text = INTERJECTION.replace_all(&text, "$1,$2");
    // Collapse doubled commas from re-shaping already shaped text
    text.replace(",,", ",").trim_end().to_string()
}
