//! Inline text encoding helpers.
//!
//! Text fragments are lowered into a platform text body with `&`, `<` and `>`
//! escaped so that inline metadata markers stay unambiguous. Mention and
//! channel markers use the `<mention:ID>` / `<channel:ID>` form, with an
//! optional display name separated by `|`.

/// Escapes user-supplied text so it cannot collide with inline markers.
pub fn escape_text(source: &str) -> String {
    source
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Inverse of [`escape_text`]. Unescapes entities in reverse order so a
/// literal `&amp;lt;` survives a round trip.
pub fn unescape_text(source: &str) -> String {
    source
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Marker for a user mention, e.g. `<mention:42>` or `<mention:42|Alice>`.
pub fn mention_marker(id: &str, name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("<mention:{id}|{name}>"),
        _ => format!("<mention:{id}>"),
    }
}

/// Marker addressing every member of the conversation.
pub fn mention_all_marker(name: Option<&str>) -> String {
    mention_marker("all", name)
}

/// Marker for a channel reference, e.g. `<channel:77>`.
pub fn channel_marker(id: &str) -> String {
    format!("<channel:{id}>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_round_trips() {
        let source = "a <b> & c &lt;";
        let escaped = escape_text(source);
        assert_eq!(escaped, "a &lt;b&gt; &amp; c &amp;lt;");
        assert_eq!(unescape_text(&escaped), source);
    }

    #[test]
    fn mention_markers_include_optional_name() {
        assert_eq!(mention_marker("42", None), "<mention:42>");
        assert_eq!(mention_marker("42", Some("Alice")), "<mention:42|Alice>");
        assert_eq!(mention_marker("42", Some("")), "<mention:42>");
        assert_eq!(mention_all_marker(None), "<mention:all>");
        assert_eq!(
            mention_all_marker(Some("everyone")),
            "<mention:all|everyone>"
        );
    }

    #[test]
    fn channel_marker_wraps_id() {
        assert_eq!(channel_marker("c1"), "<channel:c1>");
    }
}
