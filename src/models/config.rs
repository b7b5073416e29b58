//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client and retry settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Pagination budget and pacing
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Keyword DSL settings
    #[serde(default)]
    pub keywords: KeywordConfig,

    /// Notification output settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Snapshot storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Watch tasks
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            return Err(AppError::invalid_input(format!(
                "config file must have a .toml extension: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::invalid_input("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::invalid_input("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.retry_attempts == 0 {
            return Err(AppError::invalid_input("fetch.retry_attempts must be > 0"));
        }
        if self.collector.max_pages == 0 {
            return Err(AppError::invalid_input("collector.max_pages must be > 0"));
        }
        if self.collector.max_concurrent_tasks == 0 {
            return Err(AppError::invalid_input(
                "collector.max_concurrent_tasks must be > 0",
            ));
        }
        if self.keywords.separator.is_empty() {
            return Err(AppError::invalid_input("keywords.separator is empty"));
        }
        if self.storage.dir.trim().is_empty() {
            return Err(AppError::invalid_input("storage.dir is empty"));
        }

        let mut ids = HashSet::new();
        for task in &self.tasks {
            task.validate()?;
            if !ids.insert(task.id.as_str()) {
                return Err(AppError::invalid_input(format!(
                    "duplicate task id '{}'",
                    task.id
                )));
            }
        }
        Ok(())
    }

    /// Find a task by id.
    pub fn task(&self, id: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// HTTP client and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Total attempts per request, including the first
    #[serde(default = "defaults::retry_attempts")]
    pub retry_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// How the retry delay grows between attempts
    #[serde(default)]
    pub backoff: Backoff,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            retry_attempts: defaults::retry_attempts(),
            retry_delay_ms: defaults::retry_delay(),
            backoff: Backoff::default(),
        }
    }
}

/// Retry delay growth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// Delay doubles after each failed attempt
    #[default]
    Exponential,
}

/// Pagination budget and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Highest page index fetched per pass
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Delay between page requests in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,

    /// Wall-clock budget per pass in seconds (0 disables it)
    #[serde(default = "defaults::time_budget")]
    pub time_budget_secs: u64,

    /// Tasks run concurrently by `run`
    #[serde(default = "defaults::max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
}

impl CollectorConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn time_budget(&self) -> Option<Duration> {
        (self.time_budget_secs > 0).then(|| Duration::from_secs(self.time_budget_secs))
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_pages: defaults::max_pages(),
            page_delay_ms: defaults::page_delay(),
            time_budget_secs: defaults::time_budget(),
            max_concurrent_tasks: defaults::max_concurrent_tasks(),
        }
    }
}

/// Keyword DSL settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Separator between alternatives inside one include entry
    #[serde(default = "defaults::separator")]
    pub separator: String,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            separator: defaults::separator(),
        }
    }
}

/// Notification output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Render HTML instead of plain text
    #[serde(default)]
    pub html: bool,

    /// Where messages go
    #[serde(default)]
    pub channel: NotifyChannel,
}

/// Message delivery channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyChannel {
    /// Through the `log` facade
    #[default]
    Log,
    /// Printed to standard output
    Stdout,
}

/// Snapshot storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one snapshot file per task
    #[serde(default = "defaults::storage_dir")]
    pub dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: defaults::storage_dir(),
        }
    }
}

/// Record domain a task watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Shop listing pages parsed with CSS selectors
    Products,
    /// JSON search feed of performances
    Performances,
}

/// One watch task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique id, also the snapshot file name
    pub id: String,

    /// Heading used in notifications
    #[serde(default)]
    pub title: Option<String>,

    pub kind: TaskKind,

    /// Page URL template; `{page}` is replaced with the page number
    pub url: String,

    /// Include entries for the title, alternatives separated by the keyword separator
    #[serde(default)]
    pub include: Vec<String>,

    /// Exclude keywords for the title
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Include entries for the detail text (venue, seller)
    #[serde(default)]
    pub detail_include: Vec<String>,

    /// Exclude keywords for the detail text
    #[serde(default)]
    pub detail_exclude: Vec<String>,

    /// Overrides `collector.max_pages` for this task
    #[serde(default)]
    pub max_pages: Option<usize>,

    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Selectors for `products` tasks
    #[serde(default)]
    pub selectors: ProductSelectors,

    /// Field paths for `performances` tasks
    #[serde(default)]
    pub feed: FeedFields,
}

impl TaskConfig {
    /// Heading for notifications, falling back to the id.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }

    /// Validate task values that can be checked without network access.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::invalid_input("task id is empty"));
        }
        if self
            .id
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            return Err(AppError::invalid_input(format!(
                "task id '{}' may only contain ASCII letters, digits, '-' and '_'",
                self.id
            )));
        }
        if self.url.trim().is_empty() {
            return Err(AppError::invalid_input(format!(
                "task '{}' has an empty url",
                self.id
            )));
        }
        url::Url::parse(&self.url.replace("{page}", "1")).map_err(|e| {
            AppError::invalid_input(format!("task '{}' has an invalid url: {e}", self.id))
        })?;
        if self.max_pages == Some(0) {
            return Err(AppError::invalid_input(format!(
                "task '{}': max_pages must be > 0",
                self.id
            )));
        }
        match self.kind {
            TaskKind::Products => {
                if self.selectors.item.trim().is_empty() || self.selectors.name.trim().is_empty()
                {
                    return Err(AppError::invalid_input(format!(
                        "task '{}': selectors.item and selectors.name are required",
                        self.id
                    )));
                }
            }
            TaskKind::Performances => {
                if self.feed.title_field.trim().is_empty() {
                    return Err(AppError::invalid_input(format!(
                        "task '{}': feed.title_field is required",
                        self.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// CSS selectors for a product listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSelectors {
    /// Container that must exist on every page
    #[serde(default = "defaults::container")]
    pub container: String,

    /// One element per product, inside the container
    #[serde(default = "defaults::item")]
    pub item: String,

    /// Attribute of the item element holding the product code
    #[serde(default = "defaults::code_attr")]
    pub code_attr: String,

    #[serde(default = "defaults::name")]
    pub name: String,

    #[serde(default = "defaults::price")]
    pub price: String,

    #[serde(default)]
    pub list_price: Option<String>,

    #[serde(default)]
    pub discount: Option<String>,

    /// Present when the product is sold out
    #[serde(default)]
    pub sold_out: Option<String>,

    /// Link element; defaults to the name element
    #[serde(default)]
    pub link: Option<String>,

    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,
}

impl Default for ProductSelectors {
    fn default() -> Self {
        Self {
            container: defaults::container(),
            item: defaults::item(),
            code_attr: defaults::code_attr(),
            name: defaults::name(),
            price: defaults::price(),
            list_price: None,
            discount: None,
            sold_out: None,
            link: None,
            link_attr: defaults::link_attr(),
        }
    }
}

/// Field paths for a JSON search feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedFields {
    /// Dot-separated path to the item array
    #[serde(default = "defaults::items_path")]
    pub items_path: String,

    #[serde(default = "defaults::title_field")]
    pub title_field: String,

    #[serde(default = "defaults::place_field")]
    pub place_field: String,

    #[serde(default = "defaults::period_field")]
    pub period_field: String,

    #[serde(default)]
    pub url_field: Option<String>,
}

impl Default for FeedFields {
    fn default() -> Self {
        Self {
            items_path: defaults::items_path(),
            title_field: defaults::title_field(),
            place_field: defaults::place_field(),
            period_field: defaults::period_field(),
            url_field: None,
        }
    }
}

mod defaults {
    // Fetch defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; snapwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn retry_attempts() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        500
    }

    // Collector defaults
    pub fn max_pages() -> usize {
        10
    }
    pub fn page_delay() -> u64 {
        1000
    }
    pub fn time_budget() -> u64 {
        300
    }
    pub fn max_concurrent_tasks() -> usize {
        2
    }

    pub fn separator() -> String {
        "|".into()
    }
    pub fn storage_dir() -> String {
        "storage".into()
    }
    pub fn enabled() -> bool {
        true
    }

    // Product selector defaults
    pub fn container() -> String {
        "ul.product-list".into()
    }
    pub fn item() -> String {
        "li.product".into()
    }
    pub fn code_attr() -> String {
        "data-code".into()
    }
    pub fn name() -> String {
        ".name".into()
    }
    pub fn price() -> String {
        ".price".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }

    // Feed defaults
    pub fn items_path() -> String {
        "items".into()
    }
    pub fn title_field() -> String {
        "title".into()
    }
    pub fn place_field() -> String {
        "place".into()
    }
    pub fn period_field() -> String {
        "period".into()
    }
}
