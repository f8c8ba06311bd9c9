//! AWS Secrets Manager reads via the `aws` CLI.

use crate::error::{InfraError, Result};
use deploykit_core::obs;
use deploykit_core::runner::{CommandRunner, CommandSpec};
use std::sync::Arc;

pub struct SecretsManagerReader {
    region: String,
    runner: Arc<dyn CommandRunner>,
}

impl SecretsManagerReader {
    pub fn new(region: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            region: region.into(),
            runner,
        }
    }

    /// `SecretString` of `secret_id`, with the trailing newline removed.
    pub async fn secret_string(&self, secret_id: &str) -> Result<String> {
        obs::info(format!(
            "Reading secret from AWS Secrets Manager: {secret_id}"
        ));
        let spec = CommandSpec::new(
            "aws",
            [
                "secretsmanager",
                "get-secret-value",
                "--secret-id",
                secret_id,
                "--region",
                self.region.as_str(),
                "--query",
                "SecretString",
                "--output",
                "text",
            ],
        )
        .capture()
        .quiet();
        let output = self.runner.run(&spec).await?;
        let value = output.stdout.trim_end_matches(['\r', '\n']);
        if value.is_empty() || value == "None" {
            return Err(InfraError::EmptySecret(secret_id.to_string()));
        }
        Ok(value.to_string())
    }
}
