//! snapwatch CLI
//!
//! Local execution entry point. Scheduling is left to cron or a systemd timer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use snapwatch::{
    collector::CancelToken,
    diff::Trigger,
    error::{AppError, Result},
    models::Config,
    notify,
    pipeline::{self, RunOptions},
    storage::LocalStorage,
    utils::http::HttpFetcher,
};

/// snapwatch - Listing Change Notifier
#[derive(Parser, Debug)]
#[command(
    name = "snapwatch",
    version,
    about = "Watches listing pages and reports what changed"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run watch tasks once
    Run {
        /// Run only this task
        #[arg(long)]
        task: Option<String>,

        /// Treat the run as user-requested: always answer, listing everything
        /// when nothing changed
        #[arg(long)]
        user: bool,

        /// Render HTML messages
        #[arg(long)]
        html: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show stored snapshot info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run { task, user, html } => {
            let config = Config::load(&cli.config)?;
            config.validate()?;
            log::info!("Loaded configuration from {}", cli.config.display());

            let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
            let storage = LocalStorage::new(&config.storage.dir);
            let notifier = notify::notifier_for(config.notify.channel);

            let cancel = CancelToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, stopping after the current page...");
                    on_signal.cancel();
                }
            });

            let options = RunOptions {
                task,
                trigger: if user { Trigger::User } else { Trigger::Scheduled },
                html: html.then_some(true),
            };
            let runs = pipeline::run_tasks(
                &config,
                fetcher,
                &storage,
                notifier.as_ref(),
                &cancel,
                &options,
            )
            .await?;

            let failed = runs.iter().filter(|run| run.result.is_err()).count();
            for run in &runs {
                match &run.result {
                    Ok(report) if report.is_cancelled() => {
                        log::info!("{}: cancelled", run.task_id)
                    }
                    Ok(report) => log::info!(
                        "{}: {} record(s), {} page(s), stop: {:?}",
                        run.task_id,
                        report.records,
                        report.pages_fetched,
                        report.stop
                    ),
                    Err(e) => log::error!("{}: {}", run.task_id, e),
                }
            }
            if failed > 0 {
                return Err(AppError::config(format!(
                    "{failed} of {} task(s) failed",
                    runs.len()
                )));
            }
        }

        Command::Validate => {
            if let Err(e) = pipeline::run_validate(&cli.config) {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("All validations passed!");
        }

        Command::Info => {
            let config = Config::load_or_default(&cli.config);
            show_info(&config, Path::new(&config.storage.dir));
        }
    }

    Ok(())
}

fn show_info(config: &Config, storage_dir: &Path) {
    log::info!("Storage directory: {}", storage_dir.display());

    if config.tasks.is_empty() {
        log::info!("No tasks configured.");
        return;
    }

    for task in &config.tasks {
        let path = storage_dir.join(format!("{}.json", task.id));
        let stored = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok());

        match stored {
            Some(file) => log::info!(
                "{} ({}): {} record(s), updated {}",
                task.id,
                task.display_title(),
                file.get("count").unwrap_or(&serde_json::Value::Null),
                file.get("updated_at").unwrap_or(&serde_json::Value::Null)
            ),
            None => log::info!("{} ({}): no snapshot yet", task.id, task.display_title()),
        }
    }
}
