//! External process execution.
//!
//! Every tool wrapper (terraform, aws, helm) goes through the [`CommandRunner`]
//! trait so tests can replace real processes with
//! [`ScriptedRunner`](crate::fakes::ScriptedRunner).

use crate::config::AwsContext;
use crate::error::CommandError;
use crate::obs;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// A single external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Capture stdout/stderr instead of inheriting the parent's streams.
    pub capture: bool,
    /// Turn a non-zero exit into [`CommandError::Failed`].
    pub check: bool,
    /// Announce the command line before running it.
    pub verbose: bool,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
            capture: false,
            check: true,
            verbose: true,
        }
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn unchecked(mut self) -> Self {
        self.check = false;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }

    /// Space-joined program and arguments, for logs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of a finished command. Streams are empty unless captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stderr, or trimmed stdout when stderr is empty.
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Apply the `check` contract of `spec` to a finished command.
pub fn check_output(spec: &CommandSpec, output: CommandOutput) -> Result<CommandOutput, CommandError> {
    if spec.check && !output.success() {
        return Err(CommandError::Failed {
            command: spec.command_line(),
            code: output.code,
            detail: output.detail(),
        });
    }
    Ok(output)
}

/// Runs external commands to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

/// Runs commands as real child processes.
///
/// Children are killed if the returned future is dropped, which is how an
/// interrupt cancels an in-flight terraform or helm call.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    base_env: Vec<(String, String)>,
}

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner whose children inherit the AWS profile and region of `aws`.
    pub fn with_aws(aws: &AwsContext) -> Self {
        Self {
            base_env: aws.env_overrides(),
        }
    }

    pub fn base_env(&self) -> &[(String, String)] {
        &self.base_env
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        if spec.verbose {
            obs::running(&spec.command_line());
        }

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(self.base_env.iter().map(|(k, v)| (k, v)))
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }
        if spec.capture {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let child = command.spawn().map_err(|source| CommandError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        let output = child
            .wait_with_output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        check_output(spec, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_joins_args() {
        let spec = CommandSpec::new("terraform", ["apply", "-auto-approve"]);
        assert_eq!(spec.command_line(), "terraform apply -auto-approve");
        assert!(spec.check);
        assert!(spec.verbose);
        assert!(!spec.capture);
    }

    #[test]
    fn test_detail_prefers_stderr() {
        let output = CommandOutput {
            code: Some(1),
            stdout: "plan output".into(),
            stderr: "  Error: boom \n".into(),
        };
        assert_eq!(output.detail(), "Error: boom");
    }

    #[test]
    fn test_detail_falls_back_to_stdout() {
        let output = CommandOutput {
            code: Some(1),
            stdout: " only stdout\n".into(),
            stderr: "   ".into(),
        };
        assert_eq!(output.detail(), "only stdout");
    }

    #[test]
    fn test_check_output_respects_unchecked() {
        let spec = CommandSpec::new("helm", ["uninstall", "x"]).unchecked();
        let out = check_output(&spec, CommandOutput::failed(1, "not found")).unwrap();
        assert_eq!(out.code, Some(1));

        let spec = CommandSpec::new("helm", ["uninstall", "x"]);
        let err = check_output(&spec, CommandOutput::failed(1, "not found")).unwrap_err();
        assert!(err.to_string().contains("helm uninstall x"));
        assert_eq!(err.exit_code(), Some(1));
    }

    #[test]
    fn test_with_aws_sets_base_env() {
        let aws = AwsContext::new(Some("staging".into()), Some("eu-west-1".into()));
        let runner = SystemCommandRunner::with_aws(&aws);
        assert!(runner
            .base_env()
            .contains(&("AWS_PROFILE".to_string(), "staging".to_string())));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let runner = SystemCommandRunner::new();
        let spec = CommandSpec::new("deploykit-definitely-missing-binary", ["--version"])
            .capture()
            .quiet();
        let err = runner.run(&spec).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout_and_checks_exit() {
        let runner = SystemCommandRunner::new();
        let ok = runner
            .run(&CommandSpec::new("sh", ["-c", "echo hello"]).capture().quiet())
            .await
            .unwrap();
        assert_eq!(ok.stdout.trim(), "hello");

        let err = runner
            .run(&CommandSpec::new("sh", ["-c", "echo bad >&2; exit 3"]).capture().quiet())
            .await
            .unwrap_err();
        match err {
            CommandError::Failed { code, detail, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(detail, "bad");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extra_env_and_cwd_reach_child() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemCommandRunner::new();
        let out = runner
            .run(
                &CommandSpec::new("sh", ["-c", "echo $DEPLOYKIT_TEST_VAR; pwd"])
                    .env("DEPLOYKIT_TEST_VAR", "marker")
                    .cwd(dir.path())
                    .capture()
                    .quiet(),
            )
            .await
            .unwrap();
        let mut lines = out.stdout.lines();
        assert_eq!(lines.next(), Some("marker"));
        assert!(lines.next().is_some());
    }
}
