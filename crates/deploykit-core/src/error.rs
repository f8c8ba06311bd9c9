//! Error types shared by the deploykit crates.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while running an external tool.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The program could not be started at all (missing binary, bad cwd).
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited non-zero while the caller required success.
    #[error("Command failed: {command}\n{detail}")]
    Failed {
        command: String,
        code: Option<i32>,
        detail: String,
    },
}

impl CommandError {
    /// Exit code of a failed command, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Spawn { .. } => None,
            CommandError::Failed { code, .. } => *code,
        }
    }
}

/// Errors raised while loading or reading deployment configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment file does not exist
    #[error("Environment file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Environment file exists but could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Environment file has a line that is not a valid assignment
    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// A setting is present but cannot be interpreted
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display_includes_detail() {
        let err = CommandError::Failed {
            command: "terraform apply -auto-approve".to_string(),
            code: Some(1),
            detail: "Error: invalid provider".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.starts_with("Command failed: terraform apply"));
        assert!(rendered.contains("invalid provider"));
        assert_eq!(err.exit_code(), Some(1));
    }

    #[test]
    fn test_config_not_found_display() {
        let err = ConfigError::NotFound(PathBuf::from("/tmp/missing.env"));
        assert_eq!(
            err.to_string(),
            "Environment file not found: /tmp/missing.env"
        );
    }

    #[test]
    fn test_config_parse_display_names_file() {
        let err = ConfigError::Parse {
            path: PathBuf::from("/srv/pfn/.env"),
            reason: "Error parsing line: 'A=\"x'".to_string(),
        };
        assert!(err.to_string().starts_with("failed to parse /srv/pfn/.env:"));
    }
}
