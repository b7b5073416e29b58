// src/pipeline/run.rs

//! Runs the configured watch tasks.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::collector::{CancelToken, Collector, CollectorSettings, Fetcher, UrlTemplate};
use crate::diff::{DiffEngine, Trigger};
use crate::error::{AppError, Result, Stage};
use crate::keyword::{KeywordFilter, KeywordMatcher};
use crate::models::{Config, Performance, Product, TaskConfig, TaskKind};
use crate::notify::Notifier;
use crate::services::{PerformanceFeedParser, ProductPageParser};
use crate::storage::SnapshotStore;

use super::watch::{Watch, WatchReport, run_watch};

/// Options for one `run` invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Run only this task, even when it is disabled
    pub task: Option<String>,
    pub trigger: Trigger,
    /// Overrides `notify.html`
    pub html: Option<bool>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            task: None,
            trigger: Trigger::Scheduled,
            html: None,
        }
    }
}

/// Result of one task within a run.
#[derive(Debug)]
pub struct TaskRun {
    pub task_id: String,
    pub result: Result<WatchReport>,
}

/// Build the record filter for a task.
pub fn keyword_filter(task: &TaskConfig, separator: &str) -> KeywordFilter {
    let filter = KeywordFilter::new(KeywordMatcher::new(&task.include, &task.exclude, separator));
    if task.detail_include.is_empty() && task.detail_exclude.is_empty() {
        filter
    } else {
        filter.with_detail(KeywordMatcher::new(
            &task.detail_include,
            &task.detail_exclude,
            separator,
        ))
    }
}

/// Run the selected tasks, at most `collector.max_concurrent_tasks` at a time.
///
/// A failing task does not stop the others; results come back in
/// configuration order.
pub async fn run_tasks<S>(
    config: &Config,
    fetcher: Arc<dyn Fetcher>,
    store: &S,
    notifier: &dyn Notifier,
    cancel: &CancelToken,
    options: &RunOptions,
) -> Result<Vec<TaskRun>>
where
    S: SnapshotStore<Product> + SnapshotStore<Performance>,
{
    let tasks: Vec<&TaskConfig> = match &options.task {
        Some(id) => vec![config.task(id).ok_or_else(|| {
            AppError::invalid_input(format!("unknown task '{id}'"))
        })?],
        None => config.tasks.iter().filter(|t| t.enabled).collect(),
    };
    if tasks.is_empty() {
        log::warn!("No enabled tasks to run");
        return Ok(Vec::new());
    }

    let html = options.html.unwrap_or(config.notify.html);
    let concurrency = config.collector.max_concurrent_tasks.max(1);
    log::info!(
        "Running {} task(s), {} at a time",
        tasks.len(),
        concurrency
    );

    let mut runs: Vec<(usize, TaskRun)> = stream::iter(tasks.into_iter().enumerate())
        .map(|(index, task)| {
            let fetcher = Arc::clone(&fetcher);
            async move {
                let result =
                    run_task(config, task, fetcher, store, notifier, cancel, options.trigger, html)
                        .await;
                if let Err(e) = &result {
                    log::error!("[{}] {}", task.id, e);
                }
                let run = TaskRun {
                    task_id: task.id.clone(),
                    result,
                };
                (index, run)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    runs.sort_by_key(|(index, _)| *index);
    Ok(runs.into_iter().map(|(_, run)| run).collect())
}

#[allow(clippy::too_many_arguments)]
async fn run_task<S>(
    config: &Config,
    task: &TaskConfig,
    fetcher: Arc<dyn Fetcher>,
    store: &S,
    notifier: &dyn Notifier,
    cancel: &CancelToken,
    trigger: Trigger,
    html: bool,
) -> Result<WatchReport>
where
    S: SnapshotStore<Product> + SnapshotStore<Performance>,
{
    task.validate()
        .map_err(|e| AppError::stage(Stage::Validation, e))?;

    let mut settings = CollectorSettings::from(&config.collector);
    if let Some(max_pages) = task.max_pages {
        settings.max_pages = max_pages;
    }
    let collector = Collector::with_cancel(fetcher, settings, cancel.clone());
    let source = UrlTemplate::new(&task.url);
    let filter = keyword_filter(task, &config.keywords.separator);

    match task.kind {
        TaskKind::Products => {
            let parser = ProductPageParser::new(&task.selectors)
                .map_err(|e| AppError::stage(Stage::Validation, e))?;
            let watch = Watch {
                id: &task.id,
                title: task.display_title(),
                source: &source,
                parser: &parser,
                filter: &filter,
                engine: DiffEngine::new(),
            };
            run_watch(&watch, &collector, store, notifier, trigger, html).await
        }
        TaskKind::Performances => {
            let parser = PerformanceFeedParser::new(&task.feed)
                .map_err(|e| AppError::stage(Stage::Validation, e))?;
            let watch = Watch {
                id: &task.id,
                title: task.display_title(),
                source: &source,
                parser: &parser,
                filter: &filter,
                engine: DiffEngine::new(),
            };
            run_watch(&watch, &collector, store, notifier, trigger, html).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    fn task(include: &[&str], detail_include: &[&str]) -> TaskConfig {
        let toml = format!(
            r#"
id = "t"
kind = "performances"
url = "https://tickets.test/api?page={{page}}"
include = {include:?}
detail_include = {detail_include:?}
"#
        );
        toml::from_str(&toml).unwrap()
    }

    #[test]
    fn test_keyword_filter_title_only() {
        let filter = keyword_filter(&task(&["cats|rent"], &[]), "|");
        assert!(filter.accepts(&Performance::new("CATS", "Anywhere")));
        assert!(!filter.accepts(&Performance::new("Wicked", "Anywhere")));
    }

    #[test]
    fn test_keyword_filter_with_detail() {
        let filter = keyword_filter(&task(&[], &["seoul"]), "|");
        let seoul = Performance::new("Cats", "Seoul Arts Center");
        let busan = Performance::new("Cats", "Busan Cinema");
        assert_eq!(seoul.detail(), Some("Seoul Arts Center"));
        assert!(filter.accepts(&seoul));
        assert!(!filter.accepts(&busan));
    }
}
