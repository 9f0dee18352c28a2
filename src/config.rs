//! Configuration loading and constants.
//!
//! Loads application configuration from an optional TOML file, overlays the
//! `DEPLOY_TOKEN` and `KUBECONFIG` environment variables, and defines the
//! constants shared by the webhook: response texts, the restart annotation key,
//! and default paths. `AppConfig` is the root configuration struct.

use const_format::formatcp;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// Restart Annotation
// =============================================================================

/// Annotation prefix owned by kubectl
pub const KUBECTL_ANNOTATION_PREFIX: &str = "kubectl.kubernetes.io";

/// Pod template annotation watched by the deployment controller. Changing its
/// value rolls every pod of the Deployment, same as `kubectl rollout restart`.
pub const RESTARTED_AT_ANNOTATION: &str = formatcp!("{}/restartedAt", KUBECTL_ANNOTATION_PREFIX);

// =============================================================================
// Webhook Responses
// =============================================================================

pub const MSG_UNAUTHORIZED: &str = "Unauthorized";
pub const MSG_UNREADABLE_BODY: &str = "Unable to read body";
pub const MSG_INVALID_JSON: &str = "Invalid JSON body";
pub const MSG_METHOD_NOT_ALLOWED: &str = "Invalid request method";
pub const MSG_RESTART_FAILED: &str = "Failed to restart deployment";

/// Scheme prefix expected in the Authorization header
pub const BEARER_PREFIX: &str = "Bearer ";

// =============================================================================
// Environment Variables
// =============================================================================

/// Shared secret callers must present as a bearer token
pub const ENV_DEPLOY_TOKEN: &str = "DEPLOY_TOKEN";

/// Path to an external kubeconfig file
pub const ENV_KUBECONFIG: &str = "KUBECONFIG";

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Configuration file installed by the package; read when present and no
/// `--config` is given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/kickover.toml";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "kickover=info,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

/// Seconds to wait for in-flight requests after a shutdown signal
pub const SHUTDOWN_GRACE_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Webhook authentication
    #[serde(default)]
    pub auth: AuthConfig,
    /// How to obtain cluster credentials
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HTTP_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_HTTP_PORT
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Bearer token accepted by the webhook. Overridden by `DEPLOY_TOKEN`.
    pub token: Option<String>,
}

// Keep the secret out of `{:?}` output.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Source of cluster credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterMode {
    /// Service account mounted into the pod
    InCluster,
    /// An explicit kubeconfig file
    Kubeconfig,
    /// kubeconfig if one can be found, otherwise in-cluster
    Infer,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterConfig {
    /// Credential source; derived from `kubeconfig` when unset
    pub mode: Option<ClusterMode>,
    /// Path to a kubeconfig file. Falls back to `KUBECONFIG`.
    pub kubeconfig: Option<PathBuf>,
}

impl ClusterConfig {
    /// Resolve the credential source: an explicit mode wins, otherwise a known
    /// kubeconfig path selects kubeconfig mode, otherwise in-cluster.
    pub fn effective_mode(&self) -> ClusterMode {
        match (self.mode, &self.kubeconfig) {
            (Some(mode), _) => mode,
            (None, Some(_)) => ClusterMode::Kubeconfig,
            (None, None) => ClusterMode::InCluster,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Overlay environment variables onto the loaded configuration.
    ///
    /// `DEPLOY_TOKEN` always replaces the configured token. `KUBECONFIG` only
    /// fills `cluster.kubeconfig` when the file did not set one.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_DEPLOY_TOKEN) {
            self.auth.token = Some(token);
        }

        if self.cluster.kubeconfig.is_none() {
            self.cluster.kubeconfig = lookup(ENV_KUBECONFIG)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.auth.token.as_deref() {
            None | Some("") => {
                return Err(ConfigError::Validation(format!(
                    "No webhook token configured. Set {} or auth.token",
                    ENV_DEPLOY_TOKEN
                )));
            }
            Some(_) => {}
        }

        if self.cluster.mode == Some(ClusterMode::Kubeconfig) && self.cluster.kubeconfig.is_none() {
            return Err(ConfigError::Validation(format!(
                "cluster.mode = \"kubeconfig\" requires cluster.kubeconfig or {}",
                ENV_KUBECONFIG
            )));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::Validation(format!(
                "Unknown logging.format \"{}\" (expected \"text\" or \"json\")",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// The token callers must present. Only meaningful after `validate`.
    pub fn token(&self) -> &str {
        self.auth.token.as_deref().unwrap_or_default()
    }
}

/// Pick the configuration file to load.
///
/// An explicit path is always used, so a missing file there is an error. The
/// fallback is only used when it exists; otherwise defaults apply.
pub fn resolve_config_path(explicit: Option<&Path>, fallback: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None if fallback.is_file() => Some(fallback.to_path_buf()),
        None => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
