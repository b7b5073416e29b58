//! Pipeline entry points.
//!
//! - `run_watch`: One watch cycle for a single source
//! - `run_tasks`: Every configured task, bounded concurrency
//! - `run_validate`: Configuration check without network access

pub mod run;
pub mod validate;
pub mod watch;

pub use run::{RunOptions, TaskRun, keyword_filter, run_tasks};
pub use validate::run_validate;
pub use watch::{Watch, WatchReport, run_watch};
