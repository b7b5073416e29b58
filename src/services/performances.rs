//! Performance search feed parser.
//!
//! Feeds are JSON documents holding an array of items somewhere below the
//! root; the path to the array and the field names come from configuration.

use serde_json::Value;

use crate::collector::{PageParser, ParsedPage, SkippedItem};
use crate::error::{AppError, Result};
use crate::models::{FeedFields, Performance};
use crate::utils::resolve;
use crate::utils::text::normalize_whitespace;

/// Parser for JSON performance feeds.
#[derive(Debug, Clone)]
pub struct PerformanceFeedParser {
    fields: FeedFields,
}

impl PerformanceFeedParser {
    pub fn new(fields: &FeedFields) -> Result<Self> {
        if fields.title_field.trim().is_empty() {
            return Err(AppError::invalid_input("feed.title_field is empty"));
        }
        Ok(Self {
            fields: fields.clone(),
        })
    }

    fn parse_item(
        &self,
        index: usize,
        item: &Value,
        url: &str,
    ) -> std::result::Result<Performance, SkippedItem> {
        let title = field(item, &self.fields.title_field).unwrap_or_default();
        if title.is_empty() {
            return Err(SkippedItem::untitled(format!(
                "item #{} (missing title)",
                index + 1
            )));
        }

        let mut performance =
            Performance::new(title, field(item, &self.fields.place_field).unwrap_or_default());
        performance.period = field(item, &self.fields.period_field).unwrap_or_default();
        performance.url = self
            .fields
            .url_field
            .as_deref()
            .and_then(|path| field(item, path))
            .filter(|href| !href.is_empty())
            .map(|href| resolve(url, &href).unwrap_or(href));
        Ok(performance)
    }
}

impl PageParser for PerformanceFeedParser {
    type Record = Performance;

    fn parse(&self, body: &[u8], url: &str) -> Result<ParsedPage<Performance>> {
        let document: Value = serde_json::from_slice(body)?;

        let items = lookup(&document, &self.fields.items_path)
            .ok_or_else(|| AppError::structure(&self.fields.items_path, url, "path not found"))?;
        let items = match items {
            Value::Array(items) => items,
            // Some feeds drop the array entirely on an empty page
            Value::Null => return Ok(ParsedPage::empty()),
            _ => {
                return Err(AppError::structure(
                    &self.fields.items_path,
                    url,
                    "not an array",
                ));
            }
        };

        let mut page = ParsedPage::empty();
        page.raw_count = items.len();
        for (index, item) in items.iter().enumerate() {
            match self.parse_item(index, item, url) {
                Ok(performance) => page.records.push(performance),
                Err(skipped) => {
                    log::debug!("Skipping item on {url}: {}", skipped.label);
                    page.skipped.push(skipped);
                }
            }
        }
        Ok(page)
    }
}

/// Follow a dot-separated path; numeric segments index into arrays.
/// An empty path is the value itself.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// A scalar field as normalized text.
fn field(item: &Value, path: &str) -> Option<String> {
    match lookup(item, path)? {
        Value::String(s) => Some(normalize_whitespace(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
