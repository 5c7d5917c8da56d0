//! Limits applied to response bodies that end up in errors and logs.

/// Maximum body preview size for error messages (8KB).
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

/// Render a body preview as text, cut to at most `limit` bytes on a char boundary.
#[must_use]
pub fn body_preview(bytes: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= limit {
        return text.into_owned();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
