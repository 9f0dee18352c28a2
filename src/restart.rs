//! Rolling restart of a Deployment.
//!
//! A restart is a read-modify-write against the API server: fetch the
//! Deployment, stamp its pod template with `kubectl.kubernetes.io/restartedAt`,
//! and submit the whole object back. The changed template makes the deployment
//! controller roll every pod, which is what `kubectl rollout restart` does.
//!
//! There is no retry. If the object changes between fetch and replace, the
//! API server either rejects the stale `resourceVersion` or the write wins, and
//! the error (if any) goes straight back to the caller.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use serde::Deserialize;
use tracing::instrument;

use crate::cluster::{ClusterError, DeploymentStore};
use crate::config::RESTARTED_AT_ANNOTATION;

/// Body of a webhook call naming the Deployment to restart.
///
/// Missing fields decode as empty strings. The names are not checked here;
/// an empty or unknown name fails at the cluster fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RestartRequest {
    pub namespace: String,
    pub deployment_name: String,
}

/// Set the restart annotation on the pod template of `deployment`.
///
/// Creates the template metadata and annotation map if absent and overwrites
/// any previous value. Returns the timestamp written, or `None` when the
/// Deployment has no spec to stamp.
pub fn stamp_restart(deployment: &mut Deployment, at: DateTime<Utc>) -> Option<String> {
    let spec = deployment.spec.as_mut()?;
    let timestamp = at.to_rfc3339_opts(SecondsFormat::Secs, true);

    spec.template
        .metadata
        .get_or_insert_with(Default::default)
        .annotations
        .get_or_insert_with(Default::default)
        .insert(RESTARTED_AT_ANNOTATION.to_string(), timestamp.clone());

    Some(timestamp)
}

/// Performs restarts against a [`DeploymentStore`].
#[derive(Clone)]
pub struct Restarter {
    store: Arc<dyn DeploymentStore>,
}

impl Restarter {
    pub fn new(store: Arc<dyn DeploymentStore>) -> Self {
        Self { store }
    }

    /// Restart the Deployment named by `request`, returning the timestamp
    /// written to its pod template.
    #[instrument(
        name = "restart",
        skip(self, request),
        fields(namespace = %request.namespace, deployment = %request.deployment_name)
    )]
    pub async fn restart(&self, request: &RestartRequest) -> Result<String, ClusterError> {
        let namespace = request.namespace.as_str();
        let name = request.deployment_name.as_str();

        let mut deployment = self.store.get(namespace, name).await?;

        let timestamp =
            stamp_restart(&mut deployment, Utc::now()).ok_or_else(|| ClusterError::MissingSpec {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;
        self.store.replace(namespace, name, &deployment).await?;

        tracing::info!(restarted_at = %timestamp, "Deployment restart triggered");
        Ok(timestamp)
    }
}
