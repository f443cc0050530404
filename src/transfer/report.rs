//! Progress and result reporting
//!
//! The engine emits events through [`ResultReporter`]; the presentation
//! shell decides how to render them. The engine must behave identically
//! under a no-op reporter.

use std::path::Path;

use crate::transfer::engine::{BatchStatus, TransferOutcome};

/// Receives structured progress events from a running batch.
///
/// Implementations must be cheap and non-blocking; they are called from
/// worker tasks.
pub trait ResultReporter: Send + Sync {
    fn notify_directory_created(&self, _path: &Path) {}
    fn notify_item_start(&self, _item: &str) {}
    fn notify_item_success(&self, _item: &str) {}
    fn notify_item_failure(&self, _item: &str, _error: &str) {}
    fn notify_batch_complete(&self, _outcome: &TransferOutcome) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ResultReporter for NoopReporter {}

/// Emits every event as a tracing record; suitable for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ResultReporter for LogReporter {
    fn notify_directory_created(&self, path: &Path) {
        tracing::info!(path = %path.display(), "created local directory");
    }

    fn notify_item_start(&self, item: &str) {
        tracing::info!(item, "transfer started");
    }

    fn notify_item_success(&self, item: &str) {
        tracing::info!(item, "transfer succeeded");
    }

    fn notify_item_failure(&self, item: &str, error: &str) {
        tracing::warn!(item, error, "transfer failed");
    }

    fn notify_batch_complete(&self, outcome: &TransferOutcome) {
        match outcome.status() {
            BatchStatus::NoItems => tracing::warn!("no objects found"),
            _ => tracing::info!(
                attempted = outcome.attempted,
                succeeded = outcome.succeeded,
                failed = outcome.failed(),
                "batch complete"
            ),
        }
    }
}
