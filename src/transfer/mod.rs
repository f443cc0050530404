//! Batch transfer between an object store and the local filesystem
//!
//! - [`engine::TransferEngine`] - batch execution with per-item isolation
//! - [`path`] - remote key <-> local path mapping
//! - [`report`] - progress/result event interface for presentation shells

pub mod engine;
pub mod path;
pub mod report;

pub use engine::{
    BatchStatus, CancelFlag, Direction, ObjectStore, TransferEngine, TransferError,
    TransferFailure, TransferOutcome, TransferRequest, UploadItem, DEFAULT_CONCURRENCY,
    DEFAULT_LOCAL_ROOT,
};
pub use report::{LogReporter, NoopReporter, ResultReporter};
