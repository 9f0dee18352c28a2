//! `DeploymentStore` backed by the Kubernetes API.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::instrument;

use super::{ClusterError, DeploymentStore};

/// Deployments reached through a `kube::Client`.
///
/// The client is a cheap handle over a shared connection pool, so one instance
/// serves every request.
#[derive(Clone)]
pub struct KubeDeployments {
    client: Client,
}

impl KubeDeployments {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl DeploymentStore for KubeDeployments {
    #[instrument(name = "cluster.get_deployment", skip(self))]
    async fn get(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError> {
        self.api(namespace).get(name).await.map_err(|e| match e {
            kube::Error::Api(ref response) if response.code == 404 => ClusterError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            e => ClusterError::Api(e),
        })
    }

    #[instrument(name = "cluster.replace_deployment", skip(self, deployment))]
    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, ClusterError> {
        Ok(self
            .api(namespace)
            .replace(name, &PostParams::default(), deployment)
            .await?)
    }
}
