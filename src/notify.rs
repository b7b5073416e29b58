// src/notify.rs

//! Notification delivery.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::NotifyChannel;

/// Trait for notification backends.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one composed message for a task.
    async fn send(&self, task_id: &str, message: &str) -> Result<()>;
}

/// Writes messages through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, task_id: &str, message: &str) -> Result<()> {
        log::info!("[{task_id}] notification:\n{message}");
        Ok(())
    }
}

/// Prints messages to standard output, separated by a blank line.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, _task_id: &str, message: &str) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(message.as_bytes()).await?;
        stdout.write_all(b"\n\n").await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// Notifier for the configured channel.
pub fn notifier_for(channel: NotifyChannel) -> Box<dyn Notifier> {
    match channel {
        NotifyChannel::Log => Box::new(LogNotifier),
        NotifyChannel::Stdout => Box::new(StdoutNotifier),
    }
}
