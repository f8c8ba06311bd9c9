use super::{split_list, Topology};
use crate::error::Result;
use crate::plan::{OutputBinding, SecretSeed, TeardownPlan, ValidationPlan, WorkloadPlan};
use deploykit_core::config::keys;
use deploykit_core::{DeploymentValue, DeploymentVariables, EnvFile, ProvisionOutputs, ReleaseSpec};
use deploykit_validate::ValidationSettings;
use std::collections::BTreeMap;
use std::path::PathBuf;

const NLB_ANNOTATION: &str = "service.annotations.service\\.beta\\.kubernetes\\.io/aws-load-balancer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Validator,
    Vfn,
    Fullnode,
}

impl NodeKind {
    fn as_str(self) -> &'static str {
        match self {
            NodeKind::Validator => "validator",
            NodeKind::Vfn => "vfn",
            NodeKind::Fullnode => "fullnode",
        }
    }
}

#[derive(Debug, Clone)]
struct S3Bootstrap {
    bucket: String,
    prefix: String,
    region: String,
}

/// A validator with an optional VFN and an optional public fullnode, all in
/// one namespace.
#[derive(Debug, Clone)]
pub struct ValidatorVfn {
    variables: DeploymentVariables,
    chart: PathBuf,
    namespace: String,
    validator: String,
    vfn: Option<String>,
    fullnode: Option<String>,
    validator_public: bool,
    keys_secret: String,
    keys_source: Option<String>,
    bootstrap: Option<S3Bootstrap>,
    network: String,
    chain_id: String,
    settings: ValidationSettings,
}

impl ValidatorVfn {
    pub fn from_env(env: &EnvFile, chart: impl Into<PathBuf>) -> Result<Self> {
        let validator = env.get_or("VALIDATOR_NAME", "validator-01");
        let vfn = env
            .flag("DEPLOY_VFN", true)
            .then(|| env.get_or("VFN_NAME", "vfn-01"));
        let fullnode = env
            .flag("DEPLOY_FULLNODE", false)
            .then(|| env.get_or("FULLNODE_NAME", "fullnode-01"));
        let bootstrap = env.get("BOOTSTRAP_S3_BUCKET").map(|bucket| S3Bootstrap {
            bucket: bucket.to_string(),
            prefix: env.get_or("BOOTSTRAP_S3_PREFIX", "testnet/db"),
            region: env.get_or("BOOTSTRAP_S3_REGION", "us-west-2"),
        });
        let node_count = 1 + i64::from(vfn.is_some()) + i64::from(fullnode.is_some());

        Ok(Self {
            variables: terraform_variables(env, &validator, node_count),
            chart: chart.into(),
            namespace: env.get_or("NAMESPACE", "movement-l1"),
            validator,
            vfn,
            fullnode,
            validator_public: env.flag("VALIDATOR_PUBLIC", false),
            keys_secret: env.get_or("VALIDATOR_KEYS_SECRET", "validator-identity"),
            keys_source: env.get("VALIDATOR_KEYS_SECRET_NAME").map(str::to_string),
            bootstrap,
            network: env.get_or("NETWORK_NAME", "testnet"),
            chain_id: env.get_or("CHAIN_ID", "250"),
            settings: ValidationSettings::from_env(env)?,
        })
    }

    /// Deployed nodes in install order.
    fn nodes(&self) -> Vec<(NodeKind, &str)> {
        let mut nodes = vec![(NodeKind::Validator, self.validator.as_str())];
        if let Some(vfn) = &self.vfn {
            nodes.push((NodeKind::Vfn, vfn.as_str()));
        }
        if let Some(fullnode) = &self.fullnode {
            nodes.push((NodeKind::Fullnode, fullnode.as_str()));
        }
        nodes
    }

    fn service_type(&self, kind: NodeKind) -> &'static str {
        let public = match kind {
            NodeKind::Validator => self.validator_public,
            NodeKind::Vfn => self.fullnode.is_none(),
            NodeKind::Fullnode => true,
        };
        if public {
            "LoadBalancer"
        } else {
            "ClusterIP"
        }
    }

    /// The node external clients reach, if any.
    fn public_node(&self) -> Option<&str> {
        self.fullnode.as_deref().or(self.vfn.as_deref())
    }

    fn release(&self, kind: NodeKind, name: &str) -> ReleaseSpec {
        let tag = format!("Validator={}", self.validator);
        let mut spec = ReleaseSpec::new(name, &self.chart, &self.namespace)
            .set("node.type", kind.as_str())
            .set("node.name", name)
            .set("network.name", self.network.as_str())
            .set("network.chainId", self.chain_id.as_str())
            .set("storage.create", kind == NodeKind::Validator)
            .set("storage.storageClassName", "gp3")
            .set("storage.parameters.type", "gp3")
            .set("storage.parameters.iops", "6000")
            .set("storage.parameters.throughput", "500")
            .set("storage.parameters.tagSpecification_1", tag.as_str())
            .set(format!("{NLB_ANNOTATION}-type"), "nlb")
            .set(format!("{NLB_ANNOTATION}-scheme"), "internet-facing")
            .set(format!("{NLB_ANNOTATION}-additional-resource-tags"), tag.as_str())
            .set("service.type", self.service_type(kind))
            .set("genesis.enabled", true);

        spec = match &self.bootstrap {
            Some(s3) => spec
                .set("bootstrap.enabled", true)
                .set("bootstrap.s3.bucket", s3.bucket.as_str())
                .set("bootstrap.s3.prefix", s3.prefix.as_str())
                .set("bootstrap.s3.region", s3.region.as_str()),
            None => spec.set("bootstrap.enabled", false),
        };

        spec = match kind {
            NodeKind::Validator => {
                spec.set("validator.identity.existingSecret", self.keys_secret.as_str())
            }
            NodeKind::Vfn => spec
                .set("vfn.validator.serviceName", self.validator.as_str())
                .set("vfn.validator.namespace", self.namespace.as_str()),
            NodeKind::Fullnode => spec,
        };

        let config = self
            .chart
            .join("files")
            .join(format!("{}.yaml", kind.as_str()));
        if config.exists() {
            spec = spec.set_file("config.inline", config);
        }
        spec
    }
}

fn terraform_variables(env: &EnvFile, validator: &str, node_count: i64) -> DeploymentVariables {
    let mut vars = DeploymentVariables::new().with("validator_name", validator);
    for (var, key) in [("region", keys::AWS_REGION), ("vpc_cidr", "VPC_CIDR")] {
        if let Some(value) = env.get(key) {
            vars.insert(var, value);
        }
    }

    let enable_dns = env.flag("ENABLE_DNS", false);
    vars.insert("enable_dns", enable_dns);
    let zone = match env.get("DNS_ZONE_NAME") {
        Some(zone) if enable_dns => zone,
        _ => "",
    };
    vars.insert("dns_zone_name", zone);

    if let Some(types) = env.get("NODE_INSTANCE_TYPES") {
        vars.insert("node_instance_types", split_list(types));
    }

    vars.insert("node_desired_size", node_count);
    vars.insert("node_min_size", node_count);
    vars.insert("node_max_size", node_count + 2);
    let tags: BTreeMap<String, DeploymentValue> =
        BTreeMap::from([("Validator".to_string(), validator.into())]);
    vars.insert("tags", tags);
    vars
}

impl Topology for ValidatorVfn {
    fn name(&self) -> &str {
        "validator-vfn"
    }

    fn variables(&self) -> &DeploymentVariables {
        &self.variables
    }

    fn describe(&self) -> Vec<String> {
        let mut lines = vec!["Deployment Topology:".to_string()];
        for (kind, name) in self.nodes() {
            let access = match self.service_type(kind) {
                "LoadBalancer" => "LoadBalancer - public",
                _ => "ClusterIP - private",
            };
            lines.push(format!("  {}: {name} ({access})", kind.as_str()));
        }
        lines.push(match (&self.vfn, &self.fullnode) {
            (_, Some(_)) => "  → fullnode serves external clients".to_string(),
            (Some(_), None) => "  → VFN serves external clients".to_string(),
            (None, None) if self.validator_public => {
                "  → Validator-only setup: public for P2P".to_string()
            }
            (None, None) => "  → Validator-only setup: no public access".to_string(),
        });
        lines
    }

    fn workload(&self, _outputs: &ProvisionOutputs) -> Result<WorkloadPlan> {
        let nodes = self.nodes();
        let releases = nodes
            .iter()
            .map(|(kind, name)| self.release(*kind, name))
            .collect();

        let (service_name, expose_api) = match self.public_node() {
            Some(name) => (name.to_string(), true),
            None => (self.validator.clone(), false),
        };
        let companion_labels = nodes
            .iter()
            .map(|(_, name)| name.to_string())
            .filter(|name| *name != service_name)
            .collect();

        let secret = self.keys_source.as_ref().map(|source| SecretSeed {
            source_secret_id: source.clone(),
            secret_name: self.keys_secret.clone(),
            data_key: "validator-identity.yaml".to_string(),
        });

        Ok(WorkloadPlan {
            namespace: self.namespace.clone(),
            releases,
            secret,
            validation: ValidationPlan {
                service_name,
                companion_labels,
                expose_api,
                settings: self.settings.clone(),
            },
        })
    }

    fn teardown(&self) -> TeardownPlan {
        TeardownPlan {
            namespace: OutputBinding::fixed(&self.namespace),
            releases: self
                .nodes()
                .into_iter()
                .map(|(_, name)| OutputBinding::fixed(name))
                .collect(),
        }
    }
}
