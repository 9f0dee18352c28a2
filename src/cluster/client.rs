//! Cluster client construction.

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use super::ClusterError;
use crate::config::{ClusterConfig, ClusterMode};

/// Produce an authenticated cluster client from configuration.
///
/// - `in-cluster`: service account token and CA mounted into the pod
/// - `kubeconfig`: the configured file, using its current context
/// - `infer`: `KUBECONFIG` / `~/.kube/config` if present, else in-cluster
pub async fn connect(cluster: &ClusterConfig) -> Result<Client, ClusterError> {
    let mode = cluster.effective_mode();

    let config = match mode {
        ClusterMode::InCluster => Config::incluster()?,
        ClusterMode::Kubeconfig => {
            let path = cluster.kubeconfig.as_ref().ok_or_else(|| {
                ClusterError::Client(
                    "kubeconfig mode selected without a kubeconfig path".to_string(),
                )
            })?;
            tracing::debug!(path = %path.display(), "Reading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        ClusterMode::Infer => Config::infer().await?,
    };

    tracing::info!(
        mode = ?mode,
        cluster_url = %config.cluster_url,
        default_namespace = %config.default_namespace,
        "Resolved cluster credentials"
    );

    Client::try_from(config).map_err(|e| ClusterError::Client(e.to_string()))
}
