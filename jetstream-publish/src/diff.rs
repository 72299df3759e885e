//! Unified diff rendering for `jetstream diff`.

use similar::TextDiff;

/// Unified diff of `existing` against `latest`, with `a/<name>` and
/// `b/<name>` headers and three lines of context.
pub fn unified_diff(name: &str, existing: &str, latest: &str) -> String {
    let existing = normalize_line_endings(existing);
    let latest = normalize_line_endings(latest);
    let old_header = format!("a/{name}");
    let new_header = format!("b/{name}");
    TextDiff::from_lines(&existing, &latest)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string()
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}
