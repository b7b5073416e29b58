// src/render.rs

//! Notification line rendering.
//!
//! Each record type formats itself through [`Render`]; the diff engine only
//! decides which records appear, in which order, and with which marker.

use crate::utils::text::escape_html;

/// Marker placed in front of a new record.
pub const NEW_MARK: &str = "🆕";

/// Marker placed in front of a changed record.
pub const CHANGED_MARK: &str = "🔁";

/// Per-record notification formatting.
pub trait Render {
    /// One line describing the record as it is now.
    fn render(&self, html: bool) -> String;

    /// One line describing how the record changed since `previous`.
    fn render_change(&self, previous: &Self, html: bool) -> String;
}

/// Text wrapped in an anchor when rendering HTML; escaped either way.
pub fn link(text: &str, url: Option<&str>, html: bool) -> String {
    if !html {
        return text.to_string();
    }
    match url {
        Some(url) if !url.is_empty() => {
            format!("<a href=\"{}\">{}</a>", escape_html(url), escape_html(text))
        }
        _ => escape_html(text),
    }
}

/// A superseded value: struck through in HTML, plain otherwise.
pub fn superseded(text: &str, html: bool) -> String {
    if html {
        format!("<s>{}</s>", escape_html(text))
    } else {
        text.to_string()
    }
}

/// Emphasized text: bold in HTML, plain otherwise.
pub fn bold(text: &str, html: bool) -> String {
    if html {
        format!("<b>{}</b>", escape_html(text))
    } else {
        text.to_string()
    }
}

/// Escape text only when rendering HTML.
pub fn text(text: &str, html: bool) -> String {
    if html {
        escape_html(text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link() {
        assert_eq!(
            link("A & B", Some("https://shop.test/?a=1&b=2"), true),
            "<a href=\"https://shop.test/?a=1&amp;b=2\">A &amp; B</a>"
        );
        assert_eq!(link("A & B", Some("https://shop.test"), false), "A & B");
        assert_eq!(link("A & B", None, true), "A &amp; B");
    }

    #[test]
    fn test_superseded_and_bold() {
        assert_eq!(superseded("1,000원", true), "<s>1,000원</s>");
        assert_eq!(superseded("1,000원", false), "1,000원");
        assert_eq!(bold("<x>", true), "<b>&lt;x&gt;</b>");
        assert_eq!(text("<x>", false), "<x>");
    }
}
