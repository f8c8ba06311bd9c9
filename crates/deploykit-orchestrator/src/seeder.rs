//! Copies a Secrets Manager secret into the cluster before the charts that
//! mount it are installed.

use crate::error::Result;
use crate::plan::SecretSeed;
use deploykit_core::obs;
use deploykit_infra::SecretsManagerReader;
use deploykit_validate::KubeApi;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct SecretSeeder {
    kube: Arc<dyn KubeApi>,
    reader: SecretsManagerReader,
}

impl SecretSeeder {
    pub fn new(kube: Arc<dyn KubeApi>, reader: SecretsManagerReader) -> Self {
        Self { kube, reader }
    }

    /// Create the Kubernetes secret unless it already exists. Returns whether
    /// a secret was created.
    pub async fn seed(&self, namespace: &str, seed: &SecretSeed) -> Result<bool> {
        if self.kube.secret_exists(namespace, &seed.secret_name).await? {
            obs::info(format!(
                "Secret '{}' already exists in namespace '{}'",
                seed.secret_name, namespace
            ));
            return Ok(false);
        }

        let payload = self.reader.secret_string(&seed.source_secret_id).await?;

        self.kube.ensure_namespace(namespace).await?;
        let data = BTreeMap::from([(seed.data_key.clone(), payload)]);
        self.kube
            .create_secret(namespace, &seed.secret_name, data)
            .await?;
        obs::success(format!(
            "Created Kubernetes secret '{}' from AWS Secrets Manager",
            seed.secret_name
        ));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploykit_core::fakes::ScriptedRunner;
    use deploykit_validate::fakes::FakeKube;

    fn seed() -> SecretSeed {
        SecretSeed {
            source_secret_id: "testnet/validator-01".to_string(),
            secret_name: "validator-identity".to_string(),
            data_key: "validator-identity.yaml".to_string(),
        }
    }

    #[tokio::test]
    async fn test_existing_secret_skips_aws() {
        let kube = Arc::new(FakeKube::new());
        kube.insert_secret("movement-l1", "validator-identity", BTreeMap::new());
        let runner = Arc::new(ScriptedRunner::new());
        let seeder = SecretSeeder::new(
            kube.clone(),
            SecretsManagerReader::new("us-west-2", runner.clone()),
        );

        assert!(!seeder.seed("movement-l1", &seed()).await.unwrap());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_creates_secret_from_aws() {
        let kube = Arc::new(FakeKube::new());
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok(&["secretsmanager", "get-secret-value"], "account_address: 0xabc\n");
        let seeder = SecretSeeder::new(
            kube.clone(),
            SecretsManagerReader::new("us-west-2", runner.clone()),
        );

        assert!(seeder.seed("movement-l1", &seed()).await.unwrap());
        assert!(kube.has_namespace("movement-l1"));
        let stored = kube.secret("movement-l1", "validator-identity").unwrap();
        assert_eq!(
            stored.get("validator-identity.yaml").map(String::as_str),
            Some("account_address: 0xabc")
        );
    }
}
