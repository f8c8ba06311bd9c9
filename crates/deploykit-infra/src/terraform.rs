//! Terraform provisioner.

use crate::error::{InfraError, Result};
use deploykit_core::runner::{CommandRunner, CommandSpec};
use deploykit_core::{obs, DeploymentVariables, ProvisionOutputs};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs terraform against one working directory.
pub struct TerraformProvisioner {
    working_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl TerraformProvisioner {
    /// Fails if `working_dir` does not exist.
    pub fn new(working_dir: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let working_dir = working_dir.into();
        if !working_dir.exists() {
            return Err(InfraError::TerraformDirMissing(working_dir));
        }
        Ok(Self {
            working_dir,
            runner,
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn terraform<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new("terraform", args).cwd(&self.working_dir)
    }

    pub async fn init(&self, upgrade: bool) -> Result<()> {
        obs::info("Initializing Terraform");
        let mut args = vec!["init"];
        if upgrade {
            args.push("-upgrade");
        }
        self.runner.run(&self.terraform(args)).await?;
        obs::success("Terraform initialized");
        Ok(())
    }

    pub async fn validate(&self) -> Result<()> {
        obs::info("Validating Terraform configuration");
        self.runner.run(&self.terraform(["validate"])).await?;
        obs::success("Terraform configuration is valid");
        Ok(())
    }

    pub async fn plan(&self, vars: &DeploymentVariables, out_file: Option<&Path>) -> Result<()> {
        obs::info("Planning Terraform changes");
        let mut args = vec!["plan".to_string()];
        args.extend(build_var_args(vars));
        if let Some(out) = out_file {
            args.push("-out".to_string());
            args.push(out.display().to_string());
        }
        self.runner.run(&self.terraform(args)).await?;
        Ok(())
    }

    pub async fn apply(&self, vars: &DeploymentVariables, auto_approve: bool) -> Result<()> {
        obs::info("Applying Terraform configuration");
        let mut args = vec!["apply".to_string()];
        if auto_approve {
            args.push("-auto-approve".to_string());
        }
        args.extend(build_var_args(vars));
        self.runner.run(&self.terraform(args)).await?;
        obs::success("Terraform applied successfully");
        Ok(())
    }

    /// Apply a saved plan file. Variables were fixed when the plan was made.
    pub async fn apply_plan(&self, plan_file: &Path) -> Result<()> {
        obs::info("Applying Terraform configuration");
        let args = vec!["apply".to_string(), plan_file.display().to_string()];
        self.runner.run(&self.terraform(args)).await?;
        obs::success("Terraform applied successfully");
        Ok(())
    }

    pub async fn destroy(&self, vars: &DeploymentVariables, auto_approve: bool) -> Result<()> {
        obs::info("Destroying Terraform infrastructure");
        let mut args = vec!["destroy".to_string()];
        if auto_approve {
            args.push("-auto-approve".to_string());
        }
        args.extend(build_var_args(vars));
        self.runner.run(&self.terraform(args)).await?;
        obs::success("Terraform destroyed successfully");
        Ok(())
    }

    /// Current outputs. Empty when terraform fails, prints nothing, or prints
    /// something that is not JSON.
    pub async fn outputs(&self) -> ProvisionOutputs {
        let spec = self
            .terraform(["output", "-json"])
            .capture()
            .unchecked()
            .quiet();
        let output = match self.runner.run(&spec).await {
            Ok(output) if output.success() => output,
            Ok(_) => return ProvisionOutputs::default(),
            Err(e) => {
                obs::warn(format!("Failed to read Terraform outputs: {e}"));
                return ProvisionOutputs::default();
            }
        };

        let text = output.stdout.trim();
        if text.is_empty() {
            return ProvisionOutputs::default();
        }
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(document) => ProvisionOutputs::from_terraform_json(&document),
            Err(_) => {
                obs::warn("Failed to parse Terraform outputs");
                ProvisionOutputs::default()
            }
        }
    }

    /// Single output value, trimmed. `None` if terraform fails.
    pub async fn output(&self, key: &str, raw: bool) -> Option<String> {
        let mut args = vec!["output"];
        if raw {
            args.push("-raw");
        }
        args.push(key);
        let spec = self.terraform(args).capture().unchecked().quiet();
        match self.runner.run(&spec).await {
            Ok(output) if output.success() => Some(output.stdout.trim().to_string()),
            _ => None,
        }
    }
}

/// `-var k=v` arguments in key order. Nulls are skipped.
pub fn build_var_args(vars: &DeploymentVariables) -> Vec<String> {
    vars.iter()
        .filter_map(|(key, value)| value.render().map(|v| format!("{key}={v}")))
        .flat_map(|assignment| ["-var".to_string(), assignment])
        .collect()
}
