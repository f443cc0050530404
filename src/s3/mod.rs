//! S3 access module
//!
//! - [`credentials`] - credential strategies and resolution
//! - [`client::S3Client`] - wrapper over the AWS SDK client
//! - [`types`] - object keys and listing pages

pub mod client;
pub mod credentials;
pub mod types;

pub use client::{ListError, ObjectError, S3Client, S3ClientConfig};
pub use credentials::{resolve, CredentialError, CredentialSpec, ResolvedCredentials};
pub use types::{ListPage, ObjectKey};
