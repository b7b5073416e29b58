// src/utils/text.rs

//! String helpers shared by parsers and renderers.

use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

/// Escape text for inclusion in an HTML notification.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format an integer amount with thousands separators (`1234567` → `1,234,567`).
pub fn format_number(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a price in won.
pub fn format_price(value: u64) -> String {
    format!("{}원", format_number(value))
}

/// Parse the digits out of a price label such as `"12,900원"`.
///
/// Returns `None` when the label carries no digits.
pub fn parse_amount(label: &str) -> Option<u64> {
    let digits: String = label.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Truncate to at most `max` user-perceived characters, appending `…` when cut.
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Build a stable identity key from human-meaningful fields.
///
/// Fields are whitespace-normalized and lowercased before hashing so cosmetic
/// differences between pages do not produce a new identity. All-blank parts
/// yield an empty key.
pub fn composite_key(parts: &[&str]) -> String {
    if parts.iter().all(|part| part.trim().is_empty()) {
        return String::new();
    }
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(normalize_whitespace(part).to_lowercase().as_bytes());
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
        assert_eq!(escape_html("레미제라블"), "레미제라블");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_price(12900), "12,900원");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12,900원"), Some(12900));
        assert_eq!(parse_amount(" 1,000 "), Some(1000));
        assert_eq!(parse_amount("품절"), None);
    }

    #[test]
    fn test_truncate_graphemes() {
        assert_eq!(truncate_graphemes("뮤지컬 캣츠", 3), "뮤지컬…");
        assert_eq!(truncate_graphemes("short", 10), "short");
    }

    #[test]
    fn test_composite_key_ignores_cosmetics() {
        let a = composite_key(&["Les Misérables", "Blue Square"]);
        let b = composite_key(&["  les  misérables ", "BLUE SQUARE"]);
        let c = composite_key(&["Les Misérables", "Charlotte Theater"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 24);
    }

    #[test]
    fn test_composite_key_blank_parts() {
        assert_eq!(composite_key(&["", "  "]), "");
        assert_eq!(composite_key(&[]), "");
        assert_eq!(composite_key(&["", "Hall"]).len(), 24);
    }

    #[test]
    fn test_composite_key_separates_fields() {
        assert_ne!(composite_key(&["ab", "c"]), composite_key(&["a", "bc"]));
    }
}
