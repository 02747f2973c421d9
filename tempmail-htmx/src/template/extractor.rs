//! Partial content extraction from rendered pages

use std::borrow::Cow;

const START_MARKER: &str = "<!-- HTMX_PARTIAL_START -->";
const END_MARKER: &str = "<!-- HTMX_PARTIAL_END -->";

/// Content between the partial markers, or the whole document without them
///
/// ```rust
/// use tempmail_htmx::template::extract_partial;
///
/// let html = "<html><!-- HTMX_PARTIAL_START --><p>Inbox</p><!-- HTMX_PARTIAL_END --></html>";
/// assert_eq!(extract_partial(html), "<p>Inbox</p>");
/// ```
#[must_use]
pub fn extract_partial(html: &str) -> Cow<'_, str> {
    if let Some(start_pos) = html.find(START_MARKER) {
        let content_start = start_pos + START_MARKER.len();
        if let Some(end_pos) = html[content_start..].find(END_MARKER) {
            return Cow::Borrowed(html[content_start..content_start + end_pos].trim());
        }
    }
    Cow::Borrowed(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_between_markers() {
        let html = "<nav></nav>\n<!-- HTMX_PARTIAL_START -->\n  <main>x</main>\n<!-- HTMX_PARTIAL_END -->\n<footer></footer>";
        assert_eq!(extract_partial(html), "<main>x</main>");
    }

    #[test]
    fn test_missing_end_marker_returns_everything() {
        let html = "<!-- HTMX_PARTIAL_START --><main>x</main>";
        assert_eq!(extract_partial(html), html);
    }

    #[test]
    fn test_no_markers() {
        assert_eq!(extract_partial("<p>plain</p>"), "<p>plain</p>");
    }
}
