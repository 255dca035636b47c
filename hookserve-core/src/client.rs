//! Client configuration handed to hooks at initialization.

use std::path::{Path, PathBuf};

use crate::error::ClientConfigError;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
const PORT_ENV: &str = "KUBERNETES_SERVICE_PORT";

/// Connection settings for talking back to the cluster.
///
/// Resolved once at bootstrap and shared read-only by every hook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://10.0.0.1:443`.
    pub host: String,
    /// Bearer token read at resolution time.
    pub bearer_token: Option<String>,
    /// File the token was read from; clients may re-read it on rotation.
    pub bearer_token_file: Option<PathBuf>,
    /// CA bundle used to verify the cluster's serving certificate.
    pub ca_file: Option<PathBuf>,
}

impl ClientConfig {
    /// A config pointing at `host` with no credentials.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Resolve the configuration of a pod running inside the cluster.
    pub fn in_cluster() -> Result<Self, ClientConfigError> {
        let host = std::env::var(HOST_ENV).unwrap_or_default();
        let port = std::env::var(PORT_ENV).unwrap_or_default();
        Self::from_parts(&host, &port, Path::new(SERVICE_ACCOUNT_DIR))
    }

    fn from_parts(host: &str, port: &str, sa_dir: &Path) -> Result<Self, ClientConfigError> {
        if host.is_empty() || port.is_empty() {
            return Err(ClientConfigError::NotInCluster);
        }

        let token_file = sa_dir.join("token");
        let token =
            std::fs::read_to_string(&token_file).map_err(|source| ClientConfigError::Token {
                path: token_file.display().to_string(),
                source,
            })?;

        // Missing CA is tolerated; the client falls back to system roots.
        let ca_file = sa_dir.join("ca.crt");
        let ca_file = ca_file.exists().then_some(ca_file);

        Ok(Self {
            host: format!("https://{}", join_host_port(host, port)),
            bearer_token: Some(token.trim().to_string()),
            bearer_token_file: Some(token_file),
            ca_file,
        })
    }
}

fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_in_cluster_without_env() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::from_parts("", "443", dir.path()).unwrap_err();
        assert!(matches!(err, ClientConfigError::NotInCluster));
    }

    #[test]
    fn test_reads_service_account() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token"), "secret-token\n").unwrap();
        std::fs::write(dir.path().join("ca.crt"), "-----BEGIN CERTIFICATE-----").unwrap();

        let config = ClientConfig::from_parts("10.0.0.1", "443", dir.path()).unwrap();
        assert_eq!(config.host, "https://10.0.0.1:443");
        assert_eq!(config.bearer_token.as_deref(), Some("secret-token"));
        assert_eq!(config.ca_file, Some(dir.path().join("ca.crt")));
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token"), "t").unwrap();
        let config = ClientConfig::from_parts("fd00::1", "6443", dir.path()).unwrap();
        assert_eq!(config.host, "https://[fd00::1]:6443");
        assert_eq!(config.ca_file, None);
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::from_parts("10.0.0.1", "443", dir.path()).unwrap_err();
        assert!(matches!(err, ClientConfigError::Token { .. }));
    }
}
