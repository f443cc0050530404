//! Batch transfer engine
//!
//! Executes download/upload batches with per-item isolation: one object's
//! failure is recorded and the rest of the batch continues. Items run on a
//! bounded worker pool; aggregate counts are exact at any concurrency.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::s3::client::{ListError, ObjectError};
use crate::s3::types::ObjectKey;
use crate::transfer::path;
use crate::transfer::report::ResultReporter;

/// Fallback local directory when the caller supplies none.
pub const DEFAULT_LOCAL_ROOT: &str = "downloads";

/// Default bounded worker pool size.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Storage operations the engine needs. Implemented by
/// [`S3Client`](crate::s3::S3Client); tests substitute an in-memory double.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectKey>, ListError>;

    async fn fetch_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        dest: &Path,
    ) -> Result<(), ObjectError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        source: &Path,
    ) -> Result<(), ObjectError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

/// A single file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub local_source: PathBuf,
    pub remote_name: String,
}

/// Everything one batch needs, constructed once by the caller and passed by
/// value. The engine holds no state across runs.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub bucket: String,
    pub prefix: String,
    pub direction: Direction,
    pub local_root: PathBuf,
    pub preserve_subpaths: bool,
    pub uploads: Vec<UploadItem>,
}

impl TransferRequest {
    pub fn download(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        local_root: Option<PathBuf>,
        preserve_subpaths: bool,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            direction: Direction::Download,
            local_root: local_root.unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_ROOT)),
            preserve_subpaths,
            uploads: Vec::new(),
        }
    }

    pub fn upload(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        uploads: Vec<UploadItem>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            direction: Direction::Upload,
            local_root: PathBuf::from("."),
            preserve_subpaths: true,
            uploads,
        }
    }
}

/// One failed item with the message the caller can act on.
#[derive(Debug, Clone, Serialize)]
pub struct TransferFailure {
    pub item: String,
    pub error: String,
}

/// Aggregate result of one batch. Invariant:
/// `succeeded + failures.len() == attempted`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<TransferFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// The enumeration produced nothing to do; distinct from failure.
    NoItems,
    AllSucceeded,
    PartialFailure,
    AllFailed,
}

impl TransferOutcome {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempted == 0
    }

    pub fn status(&self) -> BatchStatus {
        if self.attempted == 0 {
            BatchStatus::NoItems
        } else if self.failures.is_empty() {
            BatchStatus::AllSucceeded
        } else if self.succeeded == 0 {
            BatchStatus::AllFailed
        } else {
            BatchStatus::PartialFailure
        }
    }

    fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    fn record_failure(&mut self, item: String, error: String) {
        self.attempted += 1;
        self.failures.push(TransferFailure { item, error });
    }
}

/// Fatal batch errors; per-item failures never surface here.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    List(#[from] ListError),

    #[error("failed to create local directory '{path}': {source}")]
    RootDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Cloneable cancellation handle. Setting it stops new items from starting;
/// in-flight items run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum Work {
    Fetch { key: ObjectKey, dest: PathBuf },
    Put { source: PathBuf, key: ObjectKey },
}

struct WorkItem {
    label: String,
    work: Work,
}

pub struct TransferEngine<S> {
    store: Arc<S>,
    concurrency: usize,
}

impl<S: ObjectStore + 'static> TransferEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_concurrency(store, DEFAULT_CONCURRENCY)
    }

    pub fn with_concurrency(store: S, concurrency: usize) -> Self {
        Self {
            store: Arc::new(store),
            concurrency: concurrency.max(1),
        }
    }

    /// Run one batch to completion and hand the outcome back as data.
    ///
    /// Credential resolution has already happened (the store handle exists)
    /// and the full enumeration finishes before the first transfer starts.
    pub async fn run(
        &self,
        request: TransferRequest,
        reporter: Arc<dyn ResultReporter>,
        cancel: &CancelFlag,
    ) -> Result<TransferOutcome, TransferError> {
        let mut outcome = TransferOutcome::default();

        if request.direction == Direction::Download {
            ensure_directory(&request.local_root, reporter.as_ref())
                .await
                .map_err(|source| TransferError::RootDirectory {
                    path: request.local_root.clone(),
                    source,
                })?;
        }

        let (items, conflicts) = match request.direction {
            Direction::Download => self.plan_download(&request).await?,
            Direction::Upload => (plan_upload(&request), Vec::new()),
        };

        // Keys whose destination collides with an earlier key are flagged,
        // never silently overwritten.
        for failure in conflicts {
            reporter.notify_item_failure(&failure.item, &failure.error);
            tracing::warn!(item = %failure.item, error = %failure.error, "destination conflict");
            outcome.record_failure(failure.item, failure.error);
        }

        if items.is_empty() && outcome.is_empty() {
            tracing::info!(bucket = %request.bucket, prefix = %request.prefix, "no objects found");
            reporter.notify_batch_complete(&outcome);
            return Ok(outcome);
        }

        tracing::info!(
            bucket = %request.bucket,
            prefix = %request.prefix,
            items = items.len(),
            concurrency = self.concurrency,
            "starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            // Acquiring first means a cancel request takes effect as soon as
            // a worker slot frees up, without interrupting running items.
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            if cancel.is_cancelled() {
                drop(permit);
                tracing::info!("cancellation requested; no further items will start");
                break;
            }

            let store = Arc::clone(&self.store);
            let reporter = Arc::clone(&reporter);
            let bucket = request.bucket.clone();
            let WorkItem { label, work } = item;

            handles.push((
                label.clone(),
                tokio::spawn(async move {
                    let _permit = permit;
                    reporter.notify_item_start(&label);

                    let result = match work {
                        Work::Fetch { key, dest } => {
                            fetch_one(store.as_ref(), reporter.as_ref(), &bucket, &key, &dest)
                                .await
                        }
                        Work::Put { source, key } => store
                            .put_object(&bucket, &key, &source)
                            .await
                            .map_err(|e| e.to_string()),
                    };

                    match &result {
                        Ok(()) => reporter.notify_item_success(&label),
                        Err(error) => {
                            tracing::warn!(item = %label, %error, "item transfer failed");
                            reporter.notify_item_failure(&label, error);
                        }
                    }
                    result
                }),
            ));
        }

        // Single-writer aggregation: awaiting handles in spawn order keeps
        // the failure sequence deterministic.
        for (label, handle) in handles {
            match handle.await {
                Ok(Ok(())) => outcome.record_success(),
                Ok(Err(error)) => outcome.record_failure(label, error),
                Err(join_error) => {
                    outcome.record_failure(label, format!("worker task failed: {join_error}"))
                }
            }
        }

        tracing::info!(
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failed(),
            "batch finished"
        );
        reporter.notify_batch_complete(&outcome);

        Ok(outcome)
    }

    /// Enumerate keys and map each to its local destination, splitting off
    /// keys whose destination an earlier key already claimed.
    async fn plan_download(
        &self,
        request: &TransferRequest,
    ) -> Result<(Vec<WorkItem>, Vec<TransferFailure>), TransferError> {
        let keys = self
            .store
            .list_keys(&request.bucket, &request.prefix)
            .await?;

        let mut items = Vec::with_capacity(keys.len());
        let mut conflicts = Vec::new();
        let mut claimed: HashMap<PathBuf, String> = HashMap::new();

        for key in keys {
            let dest = path::map_to_local(
                &key,
                &request.prefix,
                &request.local_root,
                request.preserve_subpaths,
            );

            if let Some(first) = claimed.get(&dest) {
                conflicts.push(TransferFailure {
                    item: key.to_string(),
                    error: format!(
                        "destination '{}' already claimed by '{}'",
                        dest.display(),
                        first
                    ),
                });
                continue;
            }

            claimed.insert(dest.clone(), key.to_string());
            items.push(WorkItem {
                label: key.to_string(),
                work: Work::Fetch { key, dest },
            });
        }

        Ok((items, conflicts))
    }
}

fn plan_upload(request: &TransferRequest) -> Vec<WorkItem> {
    request
        .uploads
        .iter()
        .map(|upload| {
            let key = path::map_to_remote(&upload.remote_name, &request.prefix);
            WorkItem {
                label: upload.local_source.display().to_string(),
                work: Work::Put {
                    source: upload.local_source.clone(),
                    key,
                },
            }
        })
        .collect()
}

async fn fetch_one(
    store: &dyn ObjectStore,
    reporter: &dyn ResultReporter,
    bucket: &str,
    key: &ObjectKey,
    dest: &Path,
) -> Result<(), String> {
    if let Some(parent) = dest.parent() {
        ensure_directory(parent, reporter)
            .await
            .map_err(|e| format!("failed to create directory '{}': {e}", parent.display()))?;
    }

    store
        .fetch_object(bucket, key, dest)
        .await
        .map_err(|e| e.to_string())
}

/// Create a directory if it is missing. Idempotent and safe under
/// concurrent attempts; only an actual creation is reported.
async fn ensure_directory(path: &Path, reporter: &dyn ResultReporter) -> std::io::Result<()> {
    if path.as_os_str().is_empty() || path.exists() {
        return Ok(());
    }
    tokio::fs::create_dir_all(path).await?;
    reporter.notify_directory_created(path);
    Ok(())
}
