//! Error types for infrastructure tooling

use deploykit_core::CommandError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for infrastructure operations
pub type Result<T> = std::result::Result<T, InfraError>;

/// Errors from Terraform, EKS, Helm and Secrets Manager calls
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Terraform directory not found: {}", .0.display())]
    TerraformDirMissing(PathBuf),

    #[error(transparent)]
    Command(#[from] CommandError),

    /// `describe-cluster` failed for a reason other than not-found
    #[error("Failed to check cluster: {0}")]
    ClusterLookup(String),

    #[error("Cluster {cluster} entered terminal state {status}")]
    ClusterTerminal { cluster: String, status: String },

    #[error("Timed out after {}s waiting for cluster {cluster} to become ACTIVE", timeout.as_secs())]
    ClusterTimeout { cluster: String, timeout: Duration },

    #[error("Secret {0} has an empty SecretString")]
    EmptySecret(String),
}
