// src/collector/mod.rs

//! Paginated collection.
//!
//! Drives a page loop against one source: fetch page N, parse it, keep the
//! candidates the filter accepts, move on. A pass ends when
//!
//! - the cancellation token is set (not an error, no snapshot),
//! - the page or time budget is spent (partial success),
//! - a page yields zero raw items (end of data), or
//! - a single-page source has been fetched once.
//!
//! A page where every item was filtered out does not end the pass. Items the
//! parser could not read are checked against the title filter when they carry
//! a title. Any fetch or parse error aborts the pass with no partial results.

mod cancel;
mod source;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{AppError, Result, Stage};
use crate::models::{CollectorConfig, Record, Snapshot};

pub use cancel::CancelToken;
pub use source::{Fetcher, PageParser, PageSource, ParsedPage, SkippedItem, UrlTemplate};

/// Page budget and pacing for one pass.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Number of the first page requested
    pub first_page: usize,
    /// Pages fetched at most per pass
    pub max_pages: usize,
    /// Pause between page requests
    pub page_delay: Duration,
    /// Wall-clock budget per pass
    pub time_budget: Option<Duration>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self::from(&CollectorConfig::default())
    }
}

impl From<&CollectorConfig> for CollectorSettings {
    fn from(config: &CollectorConfig) -> Self {
        Self {
            first_page: 1,
            max_pages: config.max_pages,
            page_delay: config.page_delay(),
            time_budget: config.time_budget(),
        }
    }
}

/// Why a pass stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page had no raw items
    EndOfData,
    /// The source has a single page
    SinglePage,
    /// `max_pages` pages were fetched
    PageLimit,
    /// The time budget ran out
    TimeBudget,
    /// The cancellation token was set
    Cancelled,
}

/// Result of one collection pass.
#[derive(Debug, Clone)]
pub struct CollectOutcome<R> {
    /// Collected records; `None` when the pass was cancelled
    pub snapshot: Option<Snapshot<R>>,
    pub stop: StopReason,
    pub pages_fetched: usize,
    /// Raw items across all pages, before filtering
    pub raw_total: usize,
    /// Records and skipped items rejected by the filter
    pub filtered_out: usize,
    /// Records dropped because an earlier page already had their key
    pub duplicates: Vec<R>,
    /// Labels of items the parser found but could not read
    pub skipped: Vec<String>,
}

impl<R> CollectOutcome<R> {
    pub fn is_cancelled(&self) -> bool {
        self.stop == StopReason::Cancelled
    }
}

/// Page-by-page collector bound to one fetcher and cancellation token.
#[derive(Clone)]
pub struct Collector {
    fetcher: Arc<dyn Fetcher>,
    settings: CollectorSettings,
    cancel: CancelToken,
}

impl Collector {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: CollectorSettings) -> Self {
        Self::with_cancel(fetcher, settings, CancelToken::new())
    }

    pub fn with_cancel(
        fetcher: Arc<dyn Fetcher>,
        settings: CollectorSettings,
        cancel: CancelToken,
    ) -> Self {
        Self {
            fetcher,
            settings,
            cancel,
        }
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Collect every page of `source`, keeping records accepted by `filter`.
    ///
    /// Records keep page order, then document order. Duplicate keys across
    /// pages keep the first occurrence.
    pub async fn collect<S, P, F>(
        &self,
        source: &S,
        parser: &P,
        filter: F,
    ) -> Result<CollectOutcome<P::Record>>
    where
        S: PageSource + ?Sized,
        P: PageParser,
        F: Fn(&P::Record) -> bool,
    {
        self.collect_matching(source, parser, filter, |_: &str| true)
            .await
    }

    /// Like [`collect`](Self::collect), also dropping skipped items whose
    /// title `title_filter` rejects. Untitled skipped items are always kept.
    pub async fn collect_matching<S, P, F, T>(
        &self,
        source: &S,
        parser: &P,
        filter: F,
        title_filter: T,
    ) -> Result<CollectOutcome<P::Record>>
    where
        S: PageSource + ?Sized,
        P: PageParser,
        F: Fn(&P::Record) -> bool,
        T: Fn(&str) -> bool,
    {
        let started = Instant::now();
        let mut page = self.settings.first_page;
        let mut snapshot = Snapshot::new();
        let mut outcome = CollectOutcome {
            snapshot: None,
            stop: StopReason::EndOfData,
            pages_fetched: 0,
            raw_total: 0,
            filtered_out: 0,
            duplicates: Vec::new(),
            skipped: Vec::new(),
        };

        loop {
            if self.cancel.is_cancelled() {
                log::info!(
                    "Collection cancelled after {} page(s)",
                    outcome.pages_fetched
                );
                outcome.stop = StopReason::Cancelled;
                return Ok(outcome);
            }
            if outcome.pages_fetched >= self.settings.max_pages {
                outcome.stop = StopReason::PageLimit;
                break;
            }
            if outcome.pages_fetched > 0 && !self.cancel.sleep(self.settings.page_delay).await {
                continue;
            }
            if let Some(budget) = self.settings.time_budget {
                if started.elapsed() >= budget {
                    log::warn!(
                        "Time budget of {:?} spent after {} page(s)",
                        budget,
                        outcome.pages_fetched
                    );
                    outcome.stop = StopReason::TimeBudget;
                    break;
                }
            }

            let url = source.page_url(page);
            log::debug!("Fetching page {page}: {url}");
            let body = self
                .fetcher
                .get(&url)
                .await
                .map_err(|e| AppError::stage(Stage::Collection, e))?;
            outcome.pages_fetched += 1;

            let parsed = parser
                .parse(&body, &url)
                .map_err(|e| AppError::stage(Stage::Parsing, e))?;

            if parsed.raw_count == 0 {
                log::debug!("Page {page} is empty, end of data");
                outcome.stop = StopReason::EndOfData;
                break;
            }

            outcome.raw_total += parsed.raw_count;
            for item in parsed.skipped {
                match &item.title {
                    Some(title) if !title_filter(title.as_str()) => outcome.filtered_out += 1,
                    _ => outcome.skipped.push(item.label),
                }
            }
            for record in parsed.records {
                if filter(&record) {
                    snapshot.push(record);
                } else {
                    outcome.filtered_out += 1;
                }
            }

            if !source.is_paginated() {
                outcome.stop = StopReason::SinglePage;
                break;
            }
            page += 1;
        }

        outcome.duplicates = snapshot.dedup_by_key();
        if !outcome.duplicates.is_empty() {
            log::warn!(
                "Dropped {} record(s) repeated across pages",
                outcome.duplicates.len()
            );
        }
        log::info!(
            "Collected {} record(s) from {} page(s) ({} raw, {} filtered out, stop: {:?})",
            snapshot.len(),
            outcome.pages_fetched,
            outcome.raw_total,
            outcome.filtered_out,
            outcome.stop
        );

        outcome.snapshot = Some(snapshot);
        Ok(outcome)
    }
}
