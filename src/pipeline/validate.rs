// src/pipeline/validate.rs

use std::path::Path;

use crate::error::{AppError, Result, Stage};
use crate::models::{Config, TaskKind};
use crate::services::{PerformanceFeedParser, ProductPageParser};

/// Load and check a configuration file without touching the network.
///
/// Beyond `Config::validate`, every task's selectors and feed fields are
/// compiled so a typo surfaces before the first scheduled run.
pub fn run_validate(path: &Path) -> Result<Config> {
    log::info!("Validating configuration at {}", path.display());

    let config = Config::load(path).map_err(|e| AppError::stage(Stage::Validation, e))?;
    check(&config).map_err(|e| AppError::stage(Stage::Validation, e))?;

    log::info!("✓ Config OK");
    log::info!("  User-Agent: {}", config.fetch.user_agent);
    log::info!(
        "  Retries: {} attempt(s), {} ms base delay ({:?})",
        config.fetch.retry_attempts,
        config.fetch.retry_delay_ms,
        config.fetch.backoff
    );
    log::info!(
        "  Pages per pass: {}, delay {} ms",
        config.collector.max_pages,
        config.collector.page_delay_ms
    );
    for task in &config.tasks {
        log::info!(
            "  Task {} ({:?}{}): {}",
            task.id,
            task.kind,
            if task.enabled { "" } else { ", disabled" },
            task.url
        );
    }
    Ok(config)
}

fn check(config: &Config) -> Result<()> {
    config.validate()?;
    for task in &config.tasks {
        match task.kind {
            TaskKind::Products => {
                ProductPageParser::new(&task.selectors)?;
            }
            TaskKind::Performances => {
                PerformanceFeedParser::new(&task.feed)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_valid_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[[tasks]]
id = "cases"
kind = "products"
url = "https://shop.test/search?page={page}"
"#,
        )
        .unwrap();

        let config = run_validate(&path).unwrap();
        assert_eq!(config.tasks.len(), 1);
    }

    #[test]
    fn test_bad_selector_fails_validation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[[tasks]]
id = "cases"
kind = "products"
url = "https://shop.test/search?page={page}"

[tasks.selectors]
price = "[[broken"
"#,
        )
        .unwrap();

        let err = run_validate(&path).unwrap_err();
        assert_eq!(err.failed_stage(), Some(Stage::Validation));
        assert!(err.to_string().starts_with("validation failed"));
    }

    #[test]
    fn test_wrong_extension_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(run_validate(&path).is_err());
    }
}
