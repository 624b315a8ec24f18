//! Size-bounded rendering of relayed fragments for the packet log.
//!
//! Only ever applied to the log copy of a fragment. The bytes relayed to
//! the client never pass through here.

use std::borrow::Cow;

/// Visible characters kept before a fragment is cut.
pub const MAX_VISIBLE_CHARS: usize = 350;

/// Marker appended to a cut fragment, on the same line as the last kept character.
pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// Shorten `fragment` for display if it is long and not JSON.
///
/// A fragment whose first non-whitespace character is `{` is returned in
/// full. Otherwise newlines do not count toward the budget: up to
/// [`MAX_VISIBLE_CHARS`] other characters are kept together with every
/// newline seen before the budget runs out, and [`TRUNCATION_MARKER`] is
/// appended directly after the last kept character.
pub fn truncate_for_log(fragment: &str) -> Cow<'_, str> {
    if fragment.trim_start().starts_with('{') {
        return Cow::Borrowed(fragment);
    }

    let visible = fragment.chars().filter(|&c| c != '\n').count();
    if visible <= MAX_VISIBLE_CHARS {
        return Cow::Borrowed(fragment);
    }

    let mut remaining = MAX_VISIBLE_CHARS;
    let mut out = String::with_capacity(fragment.len().min(4 * MAX_VISIBLE_CHARS) + TRUNCATION_MARKER.len());
    for c in fragment.chars() {
        if c == '\n' {
            out.push(c);
        } else if remaining > 0 {
            out.push(c);
            remaining -= 1;
        } else {
            break;
        }
    }
    out.push_str(TRUNCATION_MARKER);
    Cow::Owned(out)
}
