// src/keyword.rs

//! Keyword matching DSL used to filter collected records.
//!
//! A keyword set consists of include groups and an exclude list:
//!
//! - every include group must match (AND across groups), and a group matches
//!   when any of its alternatives occurs (OR within a group);
//! - any exclude keyword occurring in the text rejects it.
//!
//! Alternatives inside one entry are separated by a configurable separator
//! (`|` by default), so `["iphone|galaxy", "case"]` reads as
//! "(iphone OR galaxy) AND case".
//!
//! Matching is case-insensitive substring search that does not allocate.
//!
//! ## Known limitation
//!
//! Folding compares equal-byte-length slices, so it assumes lowercasing does
//! not change a character's UTF-8 length. This holds for ASCII, CJK and
//! Hangul. It does not hold for a few codepoints such as `İ` (U+0130), whose
//! lowercase form is longer; text containing those may miss a match.

use crate::models::Record;

/// Default separator between alternatives of one include group.
pub const DEFAULT_SEPARATOR: &str = "|";

/// Compiled keyword matcher.
///
/// Immutable after construction and safe to share across threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordMatcher {
    include_groups: Vec<Vec<String>>,
    exclude: Vec<String>,
}

impl KeywordMatcher {
    /// Compile include groups and exclude keywords using `separator` to split
    /// alternatives.
    pub fn new<I, E>(include: I, exclude: E, separator: &str) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let include_groups = include
            .into_iter()
            .map(|group| split_tokens(group.as_ref(), separator))
            .filter(|group| !group.is_empty())
            .collect();

        let exclude = exclude
            .into_iter()
            .flat_map(|entry| split_tokens(entry.as_ref(), separator))
            .collect();

        Self {
            include_groups,
            exclude,
        }
    }

    /// Compile with the default `|` separator.
    pub fn with_default_separator<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self::new(include, exclude, DEFAULT_SEPARATOR)
    }

    /// A matcher that accepts everything.
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Check whether `text` passes the exclude list and every include group.
    pub fn matches(&self, text: &str) -> bool {
        if self.exclude.iter().any(|k| contains_fold(text, k)) {
            return false;
        }

        self.include_groups
            .iter()
            .all(|group| group.iter().any(|k| contains_fold(text, k)))
    }

    /// Compiled include groups.
    pub fn include_groups(&self) -> &[Vec<String>] {
        &self.include_groups
    }

    /// Compiled exclude keywords.
    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// True when no keyword is configured at all.
    pub fn is_empty(&self) -> bool {
        self.include_groups.is_empty() && self.exclude.is_empty()
    }
}

/// Trim, lowercase and split one entry into non-empty tokens.
fn split_tokens(entry: &str, separator: &str) -> Vec<String> {
    let entry = entry.trim().to_lowercase();
    if separator.is_empty() {
        return if entry.is_empty() { Vec::new() } else { vec![entry] };
    }

    entry
        .split(separator)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-insensitive substring search without allocation.
///
/// `needle` is compared fold-wise against every equal-length slice of
/// `haystack` that starts and ends on a char boundary. See the module docs for
/// the byte-length assumption.
pub fn contains_fold(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let n = needle.len();
    if n > haystack.len() {
        return false;
    }

    haystack
        .char_indices()
        .map(|(start, _)| start)
        .take_while(|start| start + n <= haystack.len())
        .filter(|start| haystack.is_char_boundary(start + n))
        .any(|start| eq_fold(&haystack[start..start + n], needle))
}

fn eq_fold(a: &str, b: &str) -> bool {
    let mut left = a.chars();
    let mut right = b.chars();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) => {
                if x != y && !x.to_lowercase().eq(y.to_lowercase()) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Record filter built from one or two keyword matchers.
///
/// The primary matcher checks the record title; the optional detail matcher
/// checks the record's secondary text (a venue, a seller). A record without
/// detail text is judged as if its detail were empty.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    title: KeywordMatcher,
    detail: Option<KeywordMatcher>,
}

impl KeywordFilter {
    pub fn new(title: KeywordMatcher) -> Self {
        Self {
            title,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: KeywordMatcher) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Judge a bare title, for items that never became records.
    pub fn accepts_title(&self, title: &str) -> bool {
        self.title.matches(title)
    }

    pub fn accepts<R: Record>(&self, record: &R) -> bool {
        if !self.title.matches(record.title()) {
            return false;
        }
        match &self.detail {
            Some(detail) => detail.matches(record.detail().unwrap_or("")),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn matcher(include: &[&str], exclude: &[&str]) -> KeywordMatcher {
        KeywordMatcher::with_default_separator(include, exclude)
    }

    #[test]
    fn test_contains_fold_ascii() {
        assert!(contains_fold("Apple iPhone 15 Pro", "iphone"));
        assert!(contains_fold("Apple iPhone 15 Pro", "PRO"));
        assert!(!contains_fold("Apple iPhone 15 Pro", "galaxy"));
        assert!(contains_fold("anything", ""));
        assert!(!contains_fold("", "a"));
    }

    #[test]
    fn test_contains_fold_hangul() {
        assert!(contains_fold("뮤지컬 레미제라블 서울 공연", "레미제라블"));
        assert!(contains_fold("[단독] Galaxy 케이스", "galaxy 케이스"));
        assert!(!contains_fold("뮤지컬 레미제라블", "오페라"));
    }

    #[test]
    fn test_contains_fold_agrees_with_lowercase_contains() {
        let haystacks = [
            "Hello World",
            "MiXeD CaSe 텍스트 ABC",
            "콘서트 2024 SEOUL",
            "aaaaab",
            "",
        ];
        let needles = ["world", "ABC", "텍스트", "seoul", "aab", "x", "D c", "2024 s"];
        for h in haystacks {
            for n in needles {
                let expected = h.to_lowercase().contains(&n.to_lowercase());
                assert_eq!(contains_fold(h, &n.to_lowercase()), expected, "{h:?} / {n:?}");
            }
        }
    }

    #[test]
    fn test_contains_fold_does_not_split_chars() {
        // "가" is three bytes; a two-byte needle must never match mid-char.
        assert!(!contains_fold("가나다", "é"));
        assert!(contains_fold("café", "CAFÉ".to_lowercase().as_str()));
    }

    #[test]
    fn test_include_groups_and_or() {
        let m = matcher(&["iphone|galaxy", "case"], &[]);
        assert!(m.matches("Galaxy S24 Case"));
        assert!(m.matches("iPhone clear CASE"));
        assert!(!m.matches("iPhone 15"));
        assert!(!m.matches("Pixel case"));
    }

    #[test]
    fn test_exclude_short_circuits() {
        let m = matcher(&["case"], &["used|refurb"]);
        assert!(m.matches("new case"));
        assert!(!m.matches("used case"));
        assert!(!m.matches("REFURB case"));
    }

    #[test]
    fn test_empty_spec_accepts_everything() {
        let m = KeywordMatcher::accept_all();
        assert!(m.is_empty());
        assert!(m.matches(""));
        assert!(m.matches("anything at all"));
    }

    #[test]
    fn test_construction_drops_empty_tokens() {
        let m = matcher(&["  ", "a||b|", "|||", " C "], &["", " | "]);
        assert_eq!(
            m.include_groups(),
            &[vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
        );
        assert!(m.exclude().is_empty());
    }

    #[test]
    fn test_custom_and_empty_separator() {
        let m = KeywordMatcher::new(["red,blue"], Vec::<String>::new(), ",");
        assert!(m.matches("Blue shirt"));

        let m = KeywordMatcher::new(["red|blue"], Vec::<String>::new(), "");
        assert_eq!(m.include_groups(), &[vec!["red|blue".to_string()]]);
        assert!(!m.matches("red shirt"));
    }

    #[test]
    fn test_shared_across_threads() {
        let m = Arc::new(matcher(&["뮤지컬|musical"], &["취소"]));
        std::thread::scope(|scope| {
            for i in 0..8 {
                let m = Arc::clone(&m);
                scope.spawn(move || {
                    for _ in 0..100 {
                        assert!(m.matches(&format!("Musical #{i}")));
                        assert!(!m.matches("뮤지컬 공연 취소"));
                    }
                });
            }
        });
    }
}
