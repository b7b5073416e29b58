//! Snapshot diff and notification composition.
//!
//! Compares the records of the current pass with the previously persisted
//! snapshot and builds the notification text:
//!
//! - a record missing from the previous snapshot is **new**, unless it is
//!   unavailable (unknown delisted items are never announced);
//! - a record that was unavailable and is available again is **new**;
//! - a record that became unavailable is silent, but the snapshot is still
//!   replaced so the transition is remembered;
//! - a record available in both passes carries its derived state forward and
//!   is **changed** when a significant field differs.
//!
//! A record that disappeared from the listing is counted but never announced,
//! and a removal alone does not replace the stored snapshot. The stale entry
//! stays until another change rewrites the snapshot, so whether a returning
//! record is announced as new depends on whether that happened in between.
//!
//! Message sections always come in the same order: change lines, duplicate
//! warnings, unavailable items.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Record, Snapshot};
use crate::render::{self, CHANGED_MARK, NEW_MARK};

/// Preamble of the listing sent for user-triggered runs without changes.
pub const NO_CHANGES: &str = "No changes detected.";

const DUPLICATES_HEADER: &str = "Duplicate entries (ignored):";
const UNAVAILABLE_HEADER: &str = "Unavailable items:";
const EMPTY_LISTING: &str = "No items are currently being watched.";

/// What started the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Timer-driven run; silent when nothing changed
    Scheduled,
    /// Explicit request; always answers, listing everything when nothing changed
    User,
}

/// Per-run parameters for the diff.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub trigger: Trigger,
    /// Render HTML instead of plain text
    pub html: bool,
    /// Timestamp stored with derived state such as the lowest price
    pub observed_at: DateTime<Utc>,
    /// Repeats the collector already dropped, rendered for display
    pub duplicates: Vec<String>,
    /// Items the source listed but that could not be read
    pub skipped: Vec<String>,
}

impl RunContext {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            html: false,
            observed_at: Utc::now(),
            duplicates: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn scheduled() -> Self {
        Self::new(Trigger::Scheduled)
    }

    pub fn user() -> Self {
        Self::new(Trigger::User)
    }

    pub fn with_html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }

    pub fn with_duplicates(mut self, duplicates: Vec<String>) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn with_skipped(mut self, skipped: Vec<String>) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }
}

/// Counts per classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
    /// Unavailable records not known before, never announced
    pub suppressed: usize,
    /// Available before, unavailable now
    pub became_unavailable: usize,
    /// In the previous snapshot but missing from the current one
    pub removed: usize,
    /// Keys repeated within the current records
    pub duplicates: Vec<String>,
}

/// Result of a diff.
#[derive(Debug, Clone)]
pub struct DiffOutcome<R> {
    /// Notification text; empty when there is nothing to send
    pub message: String,
    /// Snapshot to store; `None` leaves the stored one untouched
    pub persist: Option<Snapshot<R>>,
    pub summary: DiffSummary,
}

impl<R> DiffOutcome<R> {
    pub fn has_message(&self) -> bool {
        !self.message.is_empty()
    }
}

/// Calculator for diffing snapshots and composing notifications.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    /// Whether significant-field changes are reported
    detect_changes: bool,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffEngine {
    pub fn new() -> Self {
        Self {
            detect_changes: true,
        }
    }

    /// An engine that only announces new records.
    pub fn additions_only() -> Self {
        Self {
            detect_changes: false,
        }
    }

    /// Diff `current` against `previous` and compose the notification.
    ///
    /// Neither input is modified; the snapshot to persist is a new value
    /// carrying updated derived state.
    pub fn diff<R: Record>(
        &self,
        current: &Snapshot<R>,
        previous: Option<&Snapshot<R>>,
        ctx: &RunContext,
    ) -> Result<DiffOutcome<R>> {
        let mut previous_by_key: HashMap<String, &R> = HashMap::new();
        if let Some(previous) = previous {
            for record in previous {
                previous_by_key.entry(record.key()).or_insert(record);
            }
        }

        let mut summary = DiffSummary::default();
        let mut seen = HashSet::new();
        let mut next = Snapshot::new();
        let mut lines = Vec::new();
        let mut duplicate_lines = ctx.duplicates.clone();

        for record in current {
            let key = record.key();
            if key.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "record '{}' has an empty key",
                    record.title()
                )));
            }
            if !seen.insert(key.clone()) {
                duplicate_lines.push(record.render(ctx.html));
                summary.duplicates.push(key);
                continue;
            }

            let mut record = record.clone();
            match previous_by_key.get(&key) {
                None if record.is_available() => {
                    record.init_derived(ctx.observed_at);
                    lines.push(format!("{NEW_MARK} {}", record.render(ctx.html)));
                    summary.new += 1;
                }
                None => summary.suppressed += 1,
                Some(prev) => {
                    record.carry_forward(prev, ctx.observed_at);
                    match (prev.is_available(), record.is_available()) {
                        (false, true) => {
                            lines.push(format!("{NEW_MARK} {}", record.render(ctx.html)));
                            summary.new += 1;
                        }
                        (true, false) => summary.became_unavailable += 1,
                        (false, false) => summary.unchanged += 1,
                        (true, true) => {
                            if self.detect_changes && record.has_changed(prev) {
                                lines.push(format!(
                                    "{CHANGED_MARK} {}",
                                    record.render_change(prev, ctx.html)
                                ));
                                summary.changed += 1;
                            } else {
                                summary.unchanged += 1;
                            }
                        }
                    }
                }
            }
            next.push(record);
        }

        summary.removed = previous_by_key
            .keys()
            .filter(|key| !seen.contains(key.as_str()))
            .count();

        let mut sections = Vec::new();
        if !lines.is_empty() {
            sections.push(lines.join("\n\n"));
        }
        if !duplicate_lines.is_empty() {
            sections.push(section(DUPLICATES_HEADER, &duplicate_lines, ctx.html));
        }
        if !ctx.skipped.is_empty() {
            let skipped: Vec<String> = ctx
                .skipped
                .iter()
                .map(|item| render::text(item, ctx.html))
                .collect();
            sections.push(section(UNAVAILABLE_HEADER, &skipped, ctx.html));
        }

        log::debug!(
            "Diff: {} new, {} changed, {} unchanged, {} suppressed, {} became unavailable, {} removed",
            summary.new,
            summary.changed,
            summary.unchanged,
            summary.suppressed,
            summary.became_unavailable,
            summary.removed
        );

        if !sections.is_empty() {
            return Ok(DiffOutcome {
                message: sections.join("\n\n"),
                persist: Some(next),
                summary,
            });
        }

        let message = match ctx.trigger {
            Trigger::Scheduled => String::new(),
            Trigger::User => listing(&next, ctx.html),
        };
        let persist = (summary.became_unavailable > 0).then_some(next);

        Ok(DiffOutcome {
            message,
            persist,
            summary,
        })
    }
}

/// Diff with the default engine.
pub fn diff_and_notify<R: Record>(
    current: &Snapshot<R>,
    previous: Option<&Snapshot<R>>,
    ctx: &RunContext,
) -> Result<DiffOutcome<R>> {
    DiffEngine::new().diff(current, previous, ctx)
}

fn section(header: &str, lines: &[String], html: bool) -> String {
    format!("{}\n{}", render::bold(header, html), lines.join("\n"))
}

fn listing<R: Record>(snapshot: &Snapshot<R>, html: bool) -> String {
    if snapshot.is_empty() {
        return format!("{NO_CHANGES} {EMPTY_LISTING}");
    }
    let lines: Vec<String> = snapshot.iter().map(|r| r.render(html)).collect();
    format!("{NO_CHANGES}\n\n{}", lines.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::{Performance, Product};

    fn product(code: &str, price: u64) -> Product {
        Product::new(code, format!("Item {code}"), price)
    }

    fn sold_out(code: &str) -> Product {
        let mut p = product(code, 1000);
        p.sold_out = true;
        p
    }

    fn snapshot(records: Vec<Product>) -> Snapshot<Product> {
        records.into()
    }

    fn ctx() -> RunContext {
        RunContext::scheduled().observed_at(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_new_item_on_first_run() {
        let current = snapshot(vec![product("1", 1000)]);

        let outcome = diff_and_notify(&current, None, &ctx()).unwrap();

        assert!(outcome.message.contains(NEW_MARK));
        assert!(outcome.message.contains("Item 1"));
        assert_eq!(outcome.message.matches(NEW_MARK).count(), 1);
        let persisted = outcome.persist.unwrap();
        assert_eq!(persisted.records()[0].lowest_price, Some(1000));
        assert_eq!(outcome.summary.new, 1);
    }

    #[test]
    fn test_new_item_against_empty_previous() {
        let current = snapshot(vec![product("1", 1000)]);
        let previous = snapshot(vec![]);

        let outcome = diff_and_notify(&current, Some(&previous), &ctx()).unwrap();

        assert!(outcome.message.contains(NEW_MARK));
        assert!(outcome.persist.is_some());
    }

    #[test]
    fn test_price_drop() {
        let current = snapshot(vec![product("1", 800)]);
        let previous = snapshot(vec![product("1", 1000)]);

        let outcome = diff_and_notify(&current, Some(&previous), &ctx()).unwrap();

        assert!(outcome.message.contains("800"));
        assert!(outcome.message.contains("1,000"));
        assert!(outcome.message.contains(CHANGED_MARK));
        assert!(outcome.persist.is_some());
        assert_eq!(outcome.summary.changed, 1);
    }

    #[test]
    fn test_no_change_scheduled_is_silent() {
        let records = snapshot(vec![product("1", 1000), product("2", 2000), sold_out("3")]);

        let outcome = diff_and_notify(&records, Some(&records), &ctx()).unwrap();

        assert_eq!(outcome.message, "");
        assert!(outcome.persist.is_none());
    }

    #[test]
    fn test_no_change_user_lists_everything() {
        let records = snapshot(vec![product("1", 1000), product("2", 2000)]);
        let ctx = RunContext::user();

        let outcome = diff_and_notify(&records, Some(&records), &ctx).unwrap();

        assert!(outcome.message.starts_with(NO_CHANGES));
        assert!(outcome.message.contains("Item 1"));
        assert!(outcome.message.contains("Item 2"));
        assert!(outcome.persist.is_none());
    }

    #[test]
    fn test_no_change_user_with_nothing_watched() {
        let empty = snapshot(vec![]);
        let outcome = diff_and_notify(&empty, Some(&empty), &RunContext::user()).unwrap();
        assert!(outcome.message.starts_with(NO_CHANGES));
        assert!(outcome.persist.is_none());
    }

    #[test]
    fn test_unknown_unavailable_is_suppressed() {
        let current = snapshot(vec![sold_out("1")]);

        let outcome = diff_and_notify(&current, None, &ctx()).unwrap();

        assert_eq!(outcome.message, "");
        assert!(outcome.persist.is_none());
        assert_eq!(outcome.summary.suppressed, 1);
    }

    #[test]
    fn test_becoming_unavailable_is_silent_but_persisted() {
        let current = snapshot(vec![sold_out("1")]);
        let previous = snapshot(vec![product("1", 1000)]);

        let outcome = diff_and_notify(&current, Some(&previous), &ctx()).unwrap();

        assert_eq!(outcome.message, "");
        assert!(!outcome.message.contains("Item 1"));
        assert!(outcome.persist.unwrap().records()[0].sold_out);
        assert_eq!(outcome.summary.became_unavailable, 1);
    }

    #[test]
    fn test_becoming_available_is_new() {
        let current = snapshot(vec![product("1", 1000)]);
        let previous = snapshot(vec![sold_out("1")]);

        let outcome = diff_and_notify(&current, Some(&previous), &ctx()).unwrap();

        assert!(outcome.message.contains(NEW_MARK));
        assert!(outcome.message.contains("Item 1"));
        assert!(outcome.persist.is_some());
    }

    #[test]
    fn test_lowest_price_survives_rediff() {
        let first = diff_and_notify(&snapshot(vec![product("1", 800)]), None, &ctx())
            .unwrap()
            .persist
            .unwrap();

        let later = ctx().observed_at(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        let outcome =
            diff_and_notify(&snapshot(vec![product("1", 1200)]), Some(&first), &later).unwrap();

        let persisted = outcome.persist.unwrap();
        assert_eq!(persisted.records()[0].lowest_price, Some(800));
        assert_eq!(
            persisted.records()[0].lowest_price_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
        );
        assert!(outcome.message.contains("lowest 800원"));
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let current = snapshot(vec![product("1", 800)]);
        let previous = snapshot(vec![product("1", 1000)]);
        let (current_before, previous_before) = (current.clone(), previous.clone());

        let _ = diff_and_notify(&current, Some(&previous), &ctx()).unwrap();

        assert_eq!(current, current_before);
        assert_eq!(previous, previous_before);
    }

    #[test]
    fn test_message_order_follows_current_order() {
        let current = snapshot(vec![product("3", 300), product("1", 90), product("2", 200)]);
        let previous = snapshot(vec![product("1", 100)]);

        let outcome = diff_and_notify(&current, Some(&previous), &ctx()).unwrap();

        let pos = |needle: &str| outcome.message.find(needle).unwrap();
        assert!(pos("Item 3") < pos("Item 1"));
        assert!(pos("Item 1") < pos("Item 2"));
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let current = snapshot(vec![product("1", 1000), product("1", 900)]);
        let ctx = ctx().with_skipped(vec!["P-404 (page not found)".to_string()]);

        let outcome = diff_and_notify(&current, None, &ctx).unwrap();

        let new_at = outcome.message.find(NEW_MARK).unwrap();
        let dup_at = outcome.message.find(DUPLICATES_HEADER).unwrap();
        let unavailable_at = outcome.message.find(UNAVAILABLE_HEADER).unwrap();
        assert!(new_at < dup_at && dup_at < unavailable_at);
        assert!(outcome.message.contains("P-404 (page not found)"));
        assert_eq!(outcome.summary.duplicates, vec!["1".to_string()]);
        assert_eq!(outcome.persist.unwrap().len(), 1);
    }

    #[test]
    fn test_skipped_items_alone_trigger_message() {
        let records = snapshot(vec![product("1", 1000)]);
        let ctx = ctx().with_skipped(vec!["P-9".to_string()]);

        let outcome = diff_and_notify(&records, Some(&records), &ctx).unwrap();

        assert!(outcome.message.contains(UNAVAILABLE_HEADER));
        assert!(outcome.persist.is_some());
    }

    #[test]
    fn test_html_output() {
        let mut p = product("1", 800);
        p.name = "A & B".into();
        p.url = "https://shop.test/1".into();
        let mut old = p.clone();
        old.price = 1000;

        let outcome = diff_and_notify(
            &snapshot(vec![p]),
            Some(&snapshot(vec![old])),
            &ctx().with_html(true),
        )
        .unwrap();

        assert!(outcome.message.contains("<a href=\"https://shop.test/1\">A &amp; B</a>"));
        assert!(outcome.message.contains("<s>1,000원</s>"));
    }

    #[test]
    fn test_additions_only_ignores_changes() {
        let current = snapshot(vec![product("1", 800)]);
        let previous = snapshot(vec![product("1", 1000)]);

        let outcome = DiffEngine::additions_only()
            .diff(&current, Some(&previous), &ctx())
            .unwrap();

        assert_eq!(outcome.message, "");
        assert!(outcome.persist.is_none());
    }

    #[test]
    fn test_removed_items_are_counted_not_announced() {
        let current = snapshot(vec![product("1", 1000)]);
        let previous = snapshot(vec![product("1", 1000), product("2", 2000)]);

        let outcome = diff_and_notify(&current, Some(&previous), &ctx()).unwrap();

        assert_eq!(outcome.message, "");
        assert_eq!(outcome.summary.removed, 1);
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let current = snapshot(vec![product("", 1000)]);
        assert!(matches!(
            diff_and_notify(&current, None, &ctx()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_performance_key_is_rejected() {
        let current: Snapshot<Performance> = vec![Performance::new(" ", "")].into();
        assert!(matches!(
            diff_and_notify(&current, None, &ctx()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_collector_duplicates_are_listed() {
        let current = snapshot(vec![product("1", 1000)]);
        let ctx = ctx().with_duplicates(vec!["Item 1 900원".to_string()]);

        let outcome = diff_and_notify(&current, Some(&current), &ctx).unwrap();

        assert!(outcome.message.starts_with(DUPLICATES_HEADER));
        assert!(outcome.message.contains("Item 1 900원"));
        assert!(outcome.summary.duplicates.is_empty());
        assert!(outcome.persist.is_some());
    }

    #[test]
    fn test_performances_new_only_once() {
        let mut cats = Performance::new("Cats", "Blue Square");
        cats.period = "05.01 ~ 05.31".into();
        let current: Snapshot<Performance> = vec![cats].into();

        let first = diff_and_notify(&current, None, &ctx()).unwrap();
        assert_eq!(first.message.matches(NEW_MARK).count(), 1);

        let second = diff_and_notify(&current, first.persist.as_ref(), &ctx()).unwrap();
        assert_eq!(second.message, "");
        assert!(second.persist.is_none());
    }
}
