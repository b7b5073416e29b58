// src/pipeline/watch.rs

//! One watch cycle: collect, diff against the stored snapshot, notify, persist.

use crate::collector::{Collector, PageParser, PageSource, StopReason};
use crate::diff::{DiffEngine, DiffSummary, RunContext, Trigger};
use crate::error::{AppError, Result, Stage};
use crate::keyword::KeywordFilter;
use crate::notify::Notifier;
use crate::render::{self, Render};
use crate::storage::SnapshotStore;

/// Everything that describes one watched source.
pub struct Watch<'a, P: PageParser> {
    /// Task id; also the storage key
    pub id: &'a str,
    /// Heading placed above the notification
    pub title: &'a str,
    pub source: &'a dyn PageSource,
    pub parser: &'a P,
    pub filter: &'a KeywordFilter,
    pub engine: DiffEngine,
}

/// Summary of one watch cycle.
#[derive(Debug, Clone)]
pub struct WatchReport {
    pub task_id: String,
    pub stop: StopReason,
    pub pages_fetched: usize,
    /// Records in the collected snapshot
    pub records: usize,
    /// `None` when the cycle was cancelled before diffing
    pub summary: Option<DiffSummary>,
    pub notified: bool,
    pub persisted: bool,
}

impl WatchReport {
    pub fn is_cancelled(&self) -> bool {
        self.stop == StopReason::Cancelled
    }
}

/// Run one watch cycle.
///
/// A cancelled collection ends the cycle quietly: nothing is loaded, sent or
/// written. The snapshot is saved only after the notification went out, so a
/// failed delivery is retried by the next cycle.
pub async fn run_watch<P: PageParser>(
    watch: &Watch<'_, P>,
    collector: &Collector,
    store: &dyn SnapshotStore<P::Record>,
    notifier: &dyn Notifier,
    trigger: Trigger,
    html: bool,
) -> Result<WatchReport> {
    log::info!("[{}] Starting watch cycle ({:?})", watch.id, trigger);

    let outcome = collector
        .collect_matching(
            watch.source,
            watch.parser,
            |record| watch.filter.accepts(record),
            |title| watch.filter.accepts_title(title),
        )
        .await?;

    let mut report = WatchReport {
        task_id: watch.id.to_string(),
        stop: outcome.stop,
        pages_fetched: outcome.pages_fetched,
        records: 0,
        summary: None,
        notified: false,
        persisted: false,
    };

    let Some(current) = outcome.snapshot else {
        log::info!("[{}] Cancelled, nothing sent or stored", watch.id);
        return Ok(report);
    };
    report.records = current.len();

    let previous = store
        .load(watch.id)
        .await
        .map_err(|e| AppError::stage(Stage::Storage, e))?;

    let duplicates = outcome
        .duplicates
        .iter()
        .map(|record| record.render(html))
        .collect();
    let ctx = RunContext::new(trigger)
        .with_html(html)
        .with_duplicates(duplicates)
        .with_skipped(outcome.skipped);
    let diff = watch
        .engine
        .diff(&current, previous.as_ref(), &ctx)
        .map_err(|e| AppError::stage(Stage::Validation, e))?;

    if diff.has_message() {
        let message = format!("{}\n\n{}", render::bold(watch.title, html), diff.message);
        notifier
            .send(watch.id, &message)
            .await
            .map_err(|e| AppError::stage(Stage::Notification, e))?;
        report.notified = true;
    }

    if let Some(snapshot) = &diff.persist {
        store
            .save(watch.id, snapshot)
            .await
            .map_err(|e| AppError::stage(Stage::Storage, e))?;
        report.persisted = true;
    }

    log::info!(
        "[{}] {} new, {} changed, {} unchanged (notified: {}, persisted: {})",
        watch.id,
        diff.summary.new,
        diff.summary.changed,
        diff.summary.unchanged,
        report.notified,
        report.persisted
    );
    report.summary = Some(diff.summary);
    Ok(report)
}
