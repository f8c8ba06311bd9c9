//! deploykit-core: shared building blocks for deploykit
//!
//! - [`value`]: typed Terraform variables and Helm overrides
//! - [`outputs`]: provisioner output lookups with defaults
//! - [`runner`]: external process execution behind the [`CommandRunner`] seam
//! - [`config`]: env-file loading and the AWS context
//! - [`poll`]: fixed-interval polling loops
//! - [`obs`] / [`telemetry`]: severity-marked logging on `tracing`

pub mod config;
pub mod error;
pub mod fakes;
pub mod model;
pub mod obs;
pub mod outputs;
pub mod poll;
pub mod runner;
pub mod telemetry;
pub mod value;

pub use config::{AwsContext, EnvFile};
pub use error::{CommandError, ConfigError};
pub use model::{ClusterHandle, ReleaseSpec};
pub use outputs::ProvisionOutputs;
pub use poll::{poll_attempts, poll_until_deadline, PollError, Probe};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemCommandRunner};
pub use value::{DeploymentValue, DeploymentVariables};
