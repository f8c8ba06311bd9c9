use super::{split_list, Topology};
use crate::error::{OrchestratorError, Result};
use crate::plan::{OutputBinding, TeardownPlan, ValidationPlan, WorkloadPlan};
use deploykit_core::config::keys;
use deploykit_core::{DeploymentVariables, EnvFile, ProvisionOutputs, ReleaseSpec};
use deploykit_validate::ValidationSettings;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "configs/testnet.pfn-restore.yaml";
const DEFAULT_NAMESPACE: &str = "movement-l1";
const DEFAULT_RELEASE: &str = "public-fullnode";
const DEFAULT_SERVICE: &str = "public-fullnode";

/// A single public fullnode restored from an S3 snapshot.
#[derive(Debug, Clone)]
pub struct PublicFullnode {
    variables: DeploymentVariables,
    chart: PathBuf,
    config_file: PathBuf,
    namespace: String,
    service: String,
    settings: ValidationSettings,
}

impl PublicFullnode {
    /// Relative paths in `env` are resolved against `root`.
    pub fn from_env(env: &EnvFile, root: &Path, chart: impl Into<PathBuf>) -> Result<Self> {
        let config_file = root.join(env.get_or("FULLNODE_CONFIG_FILE", DEFAULT_CONFIG_FILE));
        Ok(Self {
            variables: terraform_variables(env),
            chart: chart.into(),
            config_file,
            namespace: env.get_or("FULLNODE_NAMESPACE", DEFAULT_NAMESPACE),
            service: env.get_or("FULLNODE_SERVICE_NAME", DEFAULT_SERVICE),
            settings: ValidationSettings::from_env(env)?,
        })
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }
}

fn terraform_variables(env: &EnvFile) -> DeploymentVariables {
    let mut vars = DeploymentVariables::new();
    for (var, key) in [
        ("validator_name", "VALIDATOR_NAME"),
        ("region", keys::AWS_REGION),
        ("vpc_cidr", "VPC_CIDR"),
    ] {
        if let Some(value) = env.get(key) {
            vars.insert(var, value);
        }
    }

    let enable_dns = env.flag("ENABLE_DNS", false);
    vars.insert("enable_dns", enable_dns);
    let dns_value = |key: &str| {
        if enable_dns {
            env.get_or(key, "")
        } else {
            String::new()
        }
    };
    vars.insert("dns_zone_name", dns_value("DNS_ZONE_NAME"));
    vars.insert("fullnode_dns_name", dns_value("FULLNODE_DNS_NAME"));

    for (var, key) in [
        ("fullnode_bootstrap_s3_bucket", "BOOTSTRAP_S3_BUCKET"),
        ("fullnode_bootstrap_s3_prefix", "BOOTSTRAP_S3_PREFIX"),
        ("fullnode_bootstrap_s3_region", "BOOTSTRAP_S3_REGION"),
    ] {
        if let Some(value) = env.get(key) {
            vars.insert(var, value);
        }
    }

    if let Some(types) = env.get("NODE_INSTANCE_TYPES") {
        vars.insert("node_instance_types", split_list(types));
    }
    vars
}

fn required(outputs: &ProvisionOutputs, key: &str) -> Result<String> {
    outputs
        .get_str(key)
        .ok_or_else(|| OrchestratorError::MissingOutput {
            key: key.to_string(),
            reason: "bootstrap is enabled".to_string(),
        })
}

impl Topology for PublicFullnode {
    fn name(&self) -> &str {
        "public-fullnode"
    }

    fn variables(&self) -> &DeploymentVariables {
        &self.variables
    }

    fn preflight(&self) -> Result<()> {
        if !self.config_file.exists() {
            return Err(OrchestratorError::InputMissing(self.config_file.clone()));
        }
        Ok(())
    }

    fn describe(&self) -> Vec<String> {
        vec![
            format!("Chart: {}", self.chart.display()),
            format!("Config: {}", self.config_file.display()),
        ]
    }

    fn workload(&self, outputs: &ProvisionOutputs) -> Result<WorkloadPlan> {
        let namespace = outputs.string_or("public_fullnode_namespace", &self.namespace);
        let release = outputs.string_or("public_fullnode_release_name", DEFAULT_RELEASE);
        let service = outputs.string_or("public_fullnode_service_name", &self.service);

        let mut spec = ReleaseSpec::new(&release, &self.chart, &namespace)
            .set("fullnameOverride", service.as_str())
            .set("node.id", service.as_str())
            .set("storage.create", true)
            .set("storage.parameters.type", "gp3")
            .set_file("config.inline", &self.config_file);

        if outputs.flag("fullnode_bootstrap_enabled") {
            let s3_uri = required(outputs, "fullnode_bootstrap_s3_uri")?;
            let region = required(outputs, "fullnode_bootstrap_region")?;
            let account = required(outputs, "fullnode_service_account_name")?;
            let role_arn = required(outputs, "fullnode_s3_role_arn")?;
            spec = spec
                .set("bootstrap.enabled", true)
                .set("bootstrap.s3Uri", s3_uri)
                .set("bootstrap.region", region)
                .set("serviceAccount.create", true)
                .set("serviceAccount.name", account)
                .set(
                    "serviceAccount.annotations.eks\\.amazonaws\\.com/role-arn",
                    role_arn,
                );
        } else {
            spec = spec.set("bootstrap.enabled", false);
        }

        Ok(WorkloadPlan {
            namespace,
            releases: vec![spec],
            secret: None,
            validation: ValidationPlan {
                service_name: service,
                companion_labels: Vec::new(),
                expose_api: true,
                settings: self.settings.clone(),
            },
        })
    }

    fn teardown(&self) -> TeardownPlan {
        TeardownPlan {
            namespace: OutputBinding::output("public_fullnode_namespace", &self.namespace),
            releases: vec![OutputBinding::output(
                "public_fullnode_release_name",
                DEFAULT_RELEASE,
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploykit_core::DeploymentValue;

    fn topology(pairs: &[(&str, &str)]) -> PublicFullnode {
        let env = EnvFile::from_pairs(pairs.iter().copied());
        PublicFullnode::from_env(&env, Path::new("/srv/deploy"), "charts/movement-fullnode")
            .unwrap()
    }

    fn bootstrap_outputs() -> ProvisionOutputs {
        let mut outputs = ProvisionOutputs::new();
        outputs.insert("fullnode_bootstrap_enabled", true);
        outputs.insert("fullnode_bootstrap_s3_uri", "s3://snapshots/testnet/db");
        outputs.insert("fullnode_bootstrap_region", "us-west-2");
        outputs.insert("fullnode_service_account_name", "public-fullnode-s3");
        outputs.insert("fullnode_s3_role_arn", "arn:aws:iam::123456789012:role/pfn-s3");
        outputs
    }

    #[test]
    fn test_variables_from_env() {
        let pfn = topology(&[
            ("VALIDATOR_NAME", "pfn-01"),
            ("AWS_REGION", "us-west-2"),
            ("NODE_INSTANCE_TYPES", "m6i.2xlarge, m6i.4xlarge"),
            ("DNS_ZONE_NAME", "example.com"),
        ]);
        let vars = pfn.variables();
        assert_eq!(vars.get_text("validator_name"), Some("pfn-01"));
        assert_eq!(vars.get_text("region"), Some("us-west-2"));
        assert_eq!(vars.get("enable_dns"), Some(&DeploymentValue::Bool(false)));
        // DNS disabled blanks the zone even when configured
        assert_eq!(vars.get("dns_zone_name"), Some(&DeploymentValue::from("")));
        assert_eq!(vars.get("fullnode_dns_name"), Some(&DeploymentValue::from("")));
        assert_eq!(
            vars.get("node_instance_types"),
            Some(&DeploymentValue::from(vec!["m6i.2xlarge", "m6i.4xlarge"]))
        );
        assert!(vars.get("vpc_cidr").is_none());
    }

    #[test]
    fn test_dns_enabled_passes_names() {
        let pfn = topology(&[
            ("ENABLE_DNS", "true"),
            ("DNS_ZONE_NAME", "example.com"),
            ("FULLNODE_DNS_NAME", "pfn.example.com"),
        ]);
        assert_eq!(pfn.variables().get_text("dns_zone_name"), Some("example.com"));
        assert_eq!(
            pfn.variables().get_text("fullnode_dns_name"),
            Some("pfn.example.com")
        );
    }

    #[test]
    fn test_config_file_resolved_against_root() {
        let pfn = topology(&[]);
        assert_eq!(
            pfn.config_file(),
            Path::new("/srv/deploy/configs/testnet.pfn-restore.yaml")
        );
        assert!(matches!(
            pfn.preflight(),
            Err(OrchestratorError::InputMissing(_))
        ));
    }

    #[test]
    fn test_workload_without_bootstrap() {
        let plan = topology(&[]).workload(&ProvisionOutputs::new()).unwrap();
        assert_eq!(plan.namespace, "movement-l1");
        assert_eq!(plan.release_names(), vec!["public-fullnode".to_string()]);
        let spec = &plan.releases[0];
        assert_eq!(
            spec.set_values.get("bootstrap.enabled"),
            Some(&DeploymentValue::Bool(false))
        );
        assert!(!spec.set_values.contains_key("bootstrap.s3Uri"));
        assert!(spec.set_files.contains_key("config.inline"));
        assert!(plan.validation.expose_api);
        assert_eq!(plan.validation.service_name, "public-fullnode");
    }

    #[test]
    fn test_workload_with_bootstrap() {
        let mut outputs = bootstrap_outputs();
        outputs.insert("public_fullnode_namespace", "fullnodes");
        outputs.insert("public_fullnode_service_name", "pfn");
        let plan = topology(&[]).workload(&outputs).unwrap();

        let spec = &plan.releases[0];
        assert_eq!(spec.namespace, "fullnodes");
        assert_eq!(
            spec.set_values.get("bootstrap.s3Uri"),
            Some(&DeploymentValue::from("s3://snapshots/testnet/db"))
        );
        assert_eq!(
            spec.set_values
                .get("serviceAccount.annotations.eks\\.amazonaws\\.com/role-arn"),
            Some(&DeploymentValue::from("arn:aws:iam::123456789012:role/pfn-s3"))
        );
        assert_eq!(
            spec.set_values.get("fullnameOverride"),
            Some(&DeploymentValue::from("pfn"))
        );
        assert_eq!(plan.validation.service_name, "pfn");
    }

    #[test]
    fn test_node_id_follows_service_name() {
        let mut outputs = ProvisionOutputs::new();
        outputs.insert("public_fullnode_service_name", "pfn-svc");
        let plan = topology(&[]).workload(&outputs).unwrap();

        let spec = &plan.releases[0];
        assert_eq!(spec.release_name, "public-fullnode");
        assert_eq!(
            spec.set_values.get("node.id"),
            Some(&DeploymentValue::from("pfn-svc"))
        );
        assert_eq!(spec.set_values.get("node.id"), spec.set_values.get("fullnameOverride"));
    }

    #[test]
    fn test_bootstrap_requires_outputs() {
        let mut outputs = ProvisionOutputs::new();
        outputs.insert("fullnode_bootstrap_enabled", "true");
        let err = topology(&[]).workload(&outputs).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::MissingOutput { ref key, .. } if key == "fullnode_bootstrap_s3_uri"
        ));
    }

    #[test]
    fn test_teardown_bindings() {
        let plan = topology(&[("FULLNODE_NAMESPACE", "pfn-ns")]).teardown();
        assert_eq!(plan.namespace.resolve(&ProvisionOutputs::new()), "pfn-ns");
        assert_eq!(plan.releases.len(), 1);
    }
}
