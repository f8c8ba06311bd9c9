//! Environment-file configuration and the AWS context derived from it.

use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Keys understood across all topologies.
pub mod keys {
    pub const AWS_PROFILE: &str = "AWS_PROFILE";
    pub const AWS_REGION: &str = "AWS_REGION";
    pub const TERRAFORM_DIR: &str = "TERRAFORM_DIR";
    pub const CHART_DIR: &str = "CHART_DIR";
    pub const POD_READY_TIMEOUT: &str = "POD_READY_TIMEOUT";
    pub const MAX_RETRIES: &str = "MAX_RETRIES";
    pub const RETRY_INTERVAL: &str = "RETRY_INTERVAL";
}

/// Parsed `KEY=value` environment file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    values: BTreeMap<String, String>,
}

impl EnvFile {
    /// Read and parse `path`. A missing file is an error.
    ///
    /// Pairs are collected into the map only; the process environment is
    /// left untouched.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let iter = dotenvy::from_path_iter(path).map_err(|e| dotenv_error(path, e))?;
        Self::collect(path, iter)
    }

    /// Parse env-file text already in memory. `origin` only labels errors.
    pub fn from_reader<R: Read>(origin: &Path, reader: R) -> Result<Self, ConfigError> {
        Self::collect(origin, dotenvy::from_read_iter(reader))
    }

    fn collect<I>(path: &Path, pairs: I) -> Result<Self, ConfigError>
    where
        I: Iterator<Item = dotenvy::Result<(String, String)>>,
    {
        let values = pairs
            .collect::<dotenvy::Result<BTreeMap<_, _>>>()
            .map_err(|e| dotenv_error(path, e))?;
        Ok(Self { values })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of `key`, treating an empty value as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Boolean flag: `true`, `1` or `yes` (any case) are true; anything else
    /// set is false; unset yields `default`.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
            None => default,
        }
    }

    pub fn u64_or(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn secs_or(&self, key: &str, default_secs: u64) -> Result<Duration, ConfigError> {
        self.u64_or(key, default_secs).map(Duration::from_secs)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn aws_context(&self) -> AwsContext {
        AwsContext::new(
            self.get(keys::AWS_PROFILE).map(str::to_string),
            self.get(keys::AWS_REGION).map(str::to_string),
        )
    }
}

fn dotenv_error(path: &Path, err: dotenvy::Error) -> ConfigError {
    match err {
        dotenvy::Error::Io(source) => ConfigError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => ConfigError::Parse {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// AWS profile and region handed to every child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsContext {
    pub profile: Option<String>,
    pub region: Option<String>,
}

impl AwsContext {
    pub fn new(profile: Option<String>, region: Option<String>) -> Self {
        Self { profile, region }
    }

    /// Environment variables a child process needs to see this context.
    pub fn env_overrides(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(profile) = &self.profile {
            env.push(("AWS_PROFILE".to_string(), profile.clone()));
        }
        if let Some(region) = &self.region {
            env.push(("AWS_REGION".to_string(), region.clone()));
            env.push(("AWS_DEFAULT_REGION".to_string(), region.clone()));
        }
        env.push(("AWS_SDK_LOAD_CONFIG".to_string(), "1".to_string()));
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(text: &str) -> Result<EnvFile, ConfigError> {
        EnvFile::from_reader(Path::new("inline.env"), text.as_bytes())
    }

    #[test]
    fn test_parse_skips_comments_and_strips_quotes() {
        let env = parse(
            r#"
# deployment settings
AWS_PROFILE="staging"
AWS_REGION='us-west-2'

VALIDATOR_NAME=validator-01
EMPTY=
"#,
        )
        .unwrap();
        assert_eq!(env.get("AWS_PROFILE"), Some("staging"));
        assert_eq!(env.get("AWS_REGION"), Some("us-west-2"));
        assert_eq!(env.get("VALIDATOR_NAME"), Some("validator-01"));
        assert_eq!(env.get("EMPTY"), None);
    }

    #[test]
    fn test_quoted_value_may_contain_equals() {
        let env = parse("TAGS=\"a=b,c=d\"").unwrap();
        assert_eq!(env.get("TAGS"), Some("a=b,c=d"));
    }

    #[test]
    fn test_unbalanced_quote_is_parse_error() {
        let err = parse("A=\"value'\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == Path::new("inline.env")));

        let err = parse("B='x\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_later_assignment_wins() {
        let env = parse("MAX_RETRIES=3\nMAX_RETRIES=7\n").unwrap();
        assert_eq!(env.u64_or(keys::MAX_RETRIES, 60).unwrap(), 7);
    }

    #[test]
    fn test_flag_parsing() {
        let env = EnvFile::from_pairs([("A", "Yes"), ("B", "1"), ("C", "false"), ("D", "no")]);
        assert!(env.flag("A", false));
        assert!(env.flag("B", false));
        assert!(!env.flag("C", true));
        assert!(!env.flag("D", true));
        assert!(env.flag("UNSET", true));
    }

    #[test]
    fn test_u64_or_rejects_garbage() {
        let env = EnvFile::from_pairs([("MAX_RETRIES", "sixty")]);
        let err = env.u64_or(keys::MAX_RETRIES, 60).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert_eq!(env.u64_or(keys::RETRY_INTERVAL, 10).unwrap(), 10);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EnvFile::load(&dir.path().join("absent.env")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "AWS_REGION=eu-central-1\nPOD_READY_TIMEOUT=120").unwrap();
        let env = EnvFile::load(file.path()).unwrap();
        assert_eq!(
            env.secs_or(keys::POD_READY_TIMEOUT, 3600).unwrap(),
            Duration::from_secs(120)
        );
        assert_eq!(env.aws_context().region.as_deref(), Some("eu-central-1"));
        assert!(std::env::var("POD_READY_TIMEOUT").is_err());
    }

    #[test]
    fn test_load_reports_malformed_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "AWS_REGION=us-east-1\nNOT_AN_ASSIGNMENT").unwrap();
        let err = EnvFile::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == file.path()));
    }

    #[test]
    fn test_aws_env_overrides() {
        let ctx = AwsContext::new(Some("prod".into()), Some("us-east-1".into()));
        let env = ctx.env_overrides();
        assert!(env.contains(&("AWS_PROFILE".into(), "prod".into())));
        assert!(env.contains(&("AWS_DEFAULT_REGION".into(), "us-east-1".into())));
        assert!(env.contains(&("AWS_SDK_LOAD_CONFIG".into(), "1".into())));

        let bare = AwsContext::default().env_overrides();
        assert_eq!(bare, vec![("AWS_SDK_LOAD_CONFIG".into(), "1".into())]);
    }
}
