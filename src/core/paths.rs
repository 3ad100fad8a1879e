//! Path-component sanitising for report and artifact names.

/// Replace every character outside `[A-Za-z0-9-_.]` with `_`.
///
/// An input that would sanitise to nothing, `.` or `..` becomes `_` so the
/// result is always a single usable path component.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
