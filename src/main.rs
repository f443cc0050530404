//! Command-line shell for the transfer engine
//!
//! Usage:
//!   s3-transfer list
//!   s3-transfer download
//!   s3-transfer upload <file>...
//!
//! Connection parameters come from the environment: `AWS_REGION` (required),
//! `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` (optional), `S3_ROLE_ARN`
//! (optional), `S3_BUCKET` (required), `S3_PREFIX`, `S3_LOCAL_DIR` and
//! `S3_FLATTEN` (set to flatten nested keys to their basename).

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s3_transfer::s3::{self, CredentialSpec};
use s3_transfer::transfer::{
    CancelFlag, ResultReporter, TransferEngine, TransferOutcome, TransferRequest, UploadItem,
};

/// Prints progress to stdout; stands in for a real presentation layer.
struct ConsoleReporter;

impl ResultReporter for ConsoleReporter {
    fn notify_directory_created(&self, path: &Path) {
        println!("Created local directory: {}", path.display());
    }

    fn notify_item_start(&self, item: &str) {
        println!("Transferring: {item}");
    }

    fn notify_item_success(&self, item: &str) {
        println!("Done: {item}");
    }

    fn notify_item_failure(&self, item: &str, error: &str) {
        eprintln!("Failed: {item}: {error}");
    }

    fn notify_batch_complete(&self, outcome: &TransferOutcome) {
        if outcome.is_empty() {
            println!("No objects found.");
        } else {
            println!(
                "Transferred {} of {} item(s); {} failed",
                outcome.succeeded,
                outcome.attempted,
                outcome.failed()
            );
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!("usage: s3-transfer <list|download|upload> [files...]");
    };

    let region = env_opt("AWS_REGION").context("AWS_REGION is required")?;
    let bucket = env_opt("S3_BUCKET").context("S3_BUCKET is required")?;
    let prefix = env_opt("S3_PREFIX").unwrap_or_default();

    let spec = CredentialSpec::from_parts(
        region,
        env_opt("AWS_ACCESS_KEY_ID"),
        env_opt("AWS_SECRET_ACCESS_KEY"),
        env_opt("S3_ROLE_ARN"),
    );
    let client = s3::resolve(spec).await?;

    match command.as_str() {
        "list" => {
            let keys = client.list_keys(&bucket, &prefix).await?;
            if keys.is_empty() {
                println!("No files found.");
            } else {
                for key in &keys {
                    println!("{key}");
                }
                println!("{} file(s)", keys.len());
            }
        }
        "download" => {
            let request = TransferRequest::download(
                bucket,
                prefix,
                env_opt("S3_LOCAL_DIR").map(PathBuf::from),
                env_opt("S3_FLATTEN").is_none(),
            );
            let engine = TransferEngine::new(client);
            let outcome = engine
                .run(request, Arc::new(ConsoleReporter), &CancelFlag::new())
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        "upload" => {
            let uploads: Vec<UploadItem> = args[1..]
                .iter()
                .map(|arg| {
                    let local_source = PathBuf::from(arg);
                    let remote_name = local_source
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| arg.clone());
                    UploadItem {
                        local_source,
                        remote_name,
                    }
                })
                .collect();
            if uploads.is_empty() {
                bail!("upload requires at least one file argument");
            }

            let request = TransferRequest::upload(bucket, prefix, uploads);
            let engine = TransferEngine::new(client);
            let outcome = engine
                .run(request, Arc::new(ConsoleReporter), &CancelFlag::new())
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        other => bail!("unknown command '{other}'"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every batch event has a console rendering; in particular a completed
    /// item gets its own line, distinct from the start line.
    #[test]
    fn test_console_reporter_handles_full_event_sequence() {
        let reporter = ConsoleReporter;
        reporter.notify_directory_created(Path::new("downloads"));
        reporter.notify_item_start("data/a.txt");
        reporter.notify_item_success("data/a.txt");
        reporter.notify_item_failure("data/b.txt", "access denied");
        reporter.notify_batch_complete(&TransferOutcome::default());
    }
}
