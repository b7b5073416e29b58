//! Collaborator contracts used by the collector.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Record;

/// Fetches raw page bytes. Retry policy belongs to the implementation.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// An item found on a page that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Title as read from the page, if the item had one
    pub title: Option<String>,
    /// Display text, e.g. `Used Charger (price unreadable)`
    pub label: String,
}

impl SkippedItem {
    /// An item without a readable title.
    pub fn untitled(label: impl Into<String>) -> Self {
        Self {
            title: None,
            label: label.into(),
        }
    }

    pub fn titled(title: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            label: label.into(),
        }
    }
}

/// Candidates parsed from one page.
#[derive(Debug, Clone)]
pub struct ParsedPage<R> {
    /// Records built from the page, in document order
    pub records: Vec<R>,

    /// Items found on the page before any filtering or skipping
    pub raw_count: usize,

    /// Items that were found but could not be turned into records
    pub skipped: Vec<SkippedItem>,
}

impl<R> ParsedPage<R> {
    /// A page where every raw item became a record.
    pub fn complete(records: Vec<R>) -> Self {
        Self {
            raw_count: records.len(),
            records,
            skipped: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            raw_count: 0,
            skipped: Vec::new(),
        }
    }
}

/// Per-site page parser.
pub trait PageParser: Send + Sync {
    type Record: Record;

    /// Parse one page. Layout mismatches are reported as
    /// [`AppError::Structure`](crate::error::AppError::Structure).
    fn parse(&self, body: &[u8], url: &str) -> Result<ParsedPage<Self::Record>>;
}

/// Produces the URL of page `n`.
pub trait PageSource: Send + Sync {
    fn page_url(&self, page: usize) -> String;

    /// Whether later pages exist at all. Single-page sources stop after one fetch.
    fn is_paginated(&self) -> bool {
        true
    }
}

/// URL template with a `{page}` placeholder.
///
/// A template without the placeholder always yields the same URL, which suits
/// single-page sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl PageSource for UrlTemplate {
    fn page_url(&self, page: usize) -> String {
        self.template.replace("{page}", &page.to_string())
    }

    fn is_paginated(&self) -> bool {
        self.template.contains("{page}")
    }
}
