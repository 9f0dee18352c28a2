//! Access to Deployments on the Kubernetes API server.
//!
//! The webhook only needs two calls, fetch and full replace, so they sit behind
//! the [`DeploymentStore`] trait. [`KubeDeployments`] implements it over a
//! `kube::Client`; tests substitute an in-memory store.
//!
//! Credential acquisition lives in [`connect`], which turns a [`ClusterConfig`]
//! into an authenticated client (in-cluster service account, an explicit
//! kubeconfig file, or inference).
//!
//! [`ClusterConfig`]: crate::config::ClusterConfig

mod client;
mod store;

pub use client::connect;
pub use store::KubeDeployments;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;

/// Errors raised while talking to the cluster or resolving credentials.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Failed to load in-cluster configuration: {0}")]
    InCluster(#[from] kube::config::InClusterError),

    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("Failed to infer cluster configuration: {0}")]
    Infer(#[from] kube::config::InferConfigError),

    #[error("Failed to build cluster client: {0}")]
    Client(String),

    #[error("Deployment {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("Deployment {namespace}/{name} has no spec")]
    MissingSpec { namespace: String, name: String },

    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),
}

/// Fetch and replace Deployments by namespace and name.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Fetch the named Deployment.
    async fn get(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError>;

    /// Submit `deployment` as a full replacement of the named object.
    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, ClusterError>;
}
