//! Credential resolution
//!
//! Turns caller-supplied connection parameters into a ready [`S3Client`]
//! using one of three strategies:
//! - Default chain (environment variables, shared config, instance metadata)
//! - Static access/secret key pair
//! - Assume-role: a base key pair is exchanged for temporary credentials
//!   through one STS call before any S3 request is made

use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::error::DisplayErrorContext;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::s3::client::S3Client;

/// Session name sent with every assume-role request.
pub const ROLE_SESSION_NAME: &str = "AssumeRoleSession";

/// How the caller wants credentials sourced. Region is mandatory for
/// every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSpec {
    /// Delegate to the ambient AWS credential chain.
    DefaultChain { region: String },
    /// Explicit access/secret key pair.
    Static {
        region: String,
        access_key: String,
        secret_key: String,
    },
    /// Assume a role using a base key pair; the resulting temporary
    /// credentials back the client.
    AssumedRole {
        region: String,
        access_key: String,
        secret_key: String,
        role_arn: String,
    },
}

impl CredentialSpec {
    /// Build a spec from the loose optional fields a presentation shell
    /// collects. Precedence: a role ARN wins, then an explicit key pair,
    /// then the default chain.
    pub fn from_parts(
        region: impl Into<String>,
        access_key: Option<String>,
        secret_key: Option<String>,
        role_arn: Option<String>,
    ) -> Self {
        let region = region.into();
        let access_key = access_key.filter(|s| !s.is_empty());
        let secret_key = secret_key.filter(|s| !s.is_empty());

        match role_arn.filter(|s| !s.is_empty()) {
            Some(role_arn) => CredentialSpec::AssumedRole {
                region,
                access_key: access_key.unwrap_or_default(),
                secret_key: secret_key.unwrap_or_default(),
                role_arn,
            },
            None => match (access_key, secret_key) {
                (Some(access_key), Some(secret_key)) => CredentialSpec::Static {
                    region,
                    access_key,
                    secret_key,
                },
                _ => CredentialSpec::DefaultChain { region },
            },
        }
    }

    pub fn region(&self) -> &str {
        match self {
            CredentialSpec::DefaultChain { region }
            | CredentialSpec::Static { region, .. }
            | CredentialSpec::AssumedRole { region, .. } => region,
        }
    }

    /// Check the spec's own invariants without touching the network.
    pub fn validate(&self) -> Result<(), CredentialError> {
        if let CredentialSpec::AssumedRole {
            access_key,
            secret_key,
            ..
        } = self
        {
            if access_key.is_empty() || secret_key.is_empty() {
                return Err(CredentialError::MissingBaseCredentials);
            }
        }
        if self.region().is_empty() {
            return Err(CredentialError::ClientInitFailed(
                "region must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Credentials ready to construct a client from. Only assume-role results
/// carry a session token and expiry.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("access key and secret key are required to assume a role")]
    MissingBaseCredentials,

    #[error("failed to assume role: {0}")]
    AssumeRoleFailed(String),

    #[error("failed to initialize S3 client: {0}")]
    ClientInitFailed(String),
}

/// Resolve a credential spec into a usable S3 client.
///
/// The assume-role variant makes exactly one STS call; every other variant
/// is purely local client construction.
pub async fn resolve(spec: CredentialSpec) -> Result<S3Client, CredentialError> {
    spec.validate()?;

    match spec {
        CredentialSpec::DefaultChain { region } => {
            tracing::debug!(%region, "resolving credentials from default chain");
            let config = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.clone()))
                .load()
                .await;
            Ok(S3Client::new(aws_sdk_s3::Client::new(&config), region))
        }
        CredentialSpec::Static {
            region,
            access_key,
            secret_key,
        } => {
            tracing::debug!(%region, "resolving credentials from static key pair");
            Ok(S3Client::from_resolved(&ResolvedCredentials {
                access_key_id: access_key,
                secret_access_key: secret_key,
                session_token: None,
                region,
                expiry: None,
            }))
        }
        CredentialSpec::AssumedRole {
            region,
            access_key,
            secret_key,
            role_arn,
        } => {
            let resolved = assume_role(&region, &access_key, &secret_key, &role_arn).await?;
            Ok(S3Client::from_resolved(&resolved))
        }
    }
}

/// Exchange a base key pair for temporary role credentials.
async fn assume_role(
    region: &str,
    access_key: &str,
    secret_key: &str,
    role_arn: &str,
) -> Result<ResolvedCredentials, CredentialError> {
    let base = aws_sdk_sts::config::Credentials::new(
        access_key,
        secret_key,
        None,
        None,
        "base-credentials",
    );

    let sts_config = aws_sdk_sts::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(base)
        .build();
    let sts = aws_sdk_sts::Client::from_conf(sts_config);

    tracing::info!(%role_arn, "assuming role");

    let response = sts
        .assume_role()
        .role_arn(role_arn)
        .role_session_name(ROLE_SESSION_NAME)
        .send()
        .await
        .map_err(|e| CredentialError::AssumeRoleFailed(format!("{}", DisplayErrorContext(&e))))?;

    let creds = response.credentials().ok_or_else(|| {
        CredentialError::AssumeRoleFailed("assume-role response contained no credentials".to_string())
    })?;

    let expiry = {
        let d = creds.expiration();
        chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos())
    };

    Ok(ResolvedCredentials {
        access_key_id: creds.access_key_id().to_string(),
        secret_access_key: creds.secret_access_key().to_string(),
        session_token: Some(creds.session_token().to_string()),
        region: region.to_string(),
        expiry,
    })
}
