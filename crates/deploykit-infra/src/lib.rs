//! deploykit-infra: wrappers around the external infrastructure tools
//!
//! Each wrapper builds command lines and interprets exit codes; the actual
//! process execution goes through [`deploykit_core::CommandRunner`].

pub mod eks;
pub mod error;
pub mod helm;
pub mod secrets;
pub mod terraform;

pub use eks::{ActiveWait, EksReadinessProbe};
pub use error::{InfraError, Result};
pub use helm::HelmDeployer;
pub use secrets::SecretsManagerReader;
pub use terraform::{build_var_args, TerraformProvisioner};
