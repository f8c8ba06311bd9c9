//! Error types for deployment orchestration

use deploykit_core::ConfigError;
use deploykit_infra::InfraError;
use deploykit_validate::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Infra(#[from] InfraError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Apply succeeded but `terraform output -json` is still empty
    #[error("Terraform apply completed but no outputs found")]
    NoOutputs,

    /// A topology built a plan with nothing to install
    #[error("Topology {0} produced no releases")]
    EmptyPlan(String),

    /// A file the topology needs is missing
    #[error("Config file not found: {}", .0.display())]
    InputMissing(PathBuf),

    /// An output the plan depends on is absent
    #[error("Terraform output {key} is required: {reason}")]
    MissingOutput { key: String, reason: String },
}
