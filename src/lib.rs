//! S3 batch transfer library
//!
//! Resolves AWS credentials (static, default-chain or role-assumed), lists
//! objects under a bucket prefix, and moves objects between S3 and the local
//! filesystem with per-item failure isolation. Presentation is left to the
//! caller: the engine reports through the [`transfer::ResultReporter`] trait
//! and returns a [`transfer::TransferOutcome`] value.

pub mod s3;
pub mod transfer;
