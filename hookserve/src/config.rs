//! Server configuration.
//!
//! [`Options`] is the command-line surface; [`ServerConfig`] is what the
//! server actually reads. Tests build a `ServerConfig` directly.

use clap::Parser;
use hookserve_std::dispatch::DEFAULT_MAX_IN_FLIGHT;
use std::{net::IpAddr, time::Duration};

/// Default request body limit: 3 MiB.
pub const DEFAULT_MAX_REQUEST_BODY_BYTES: usize = 3 * 1024 * 1024;

/// Command-line options for an admission server.
#[derive(Debug, Clone, Parser)]
#[command(about = "Serve admission and conversion webhooks")]
pub struct Options {
    /// Address to listen on.
    #[arg(long, env = "HOOKSERVE_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "HOOKSERVE_PORT", default_value_t = 8443)]
    pub port: u16,

    /// Seconds a hook may take to answer one review.
    #[arg(long, default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Largest accepted review body, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_REQUEST_BODY_BYTES)]
    pub max_request_body_bytes: usize,

    /// Hook calls one route may have running at once, including timed-out ones.
    #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
    pub max_in_flight_per_hook: usize,

    /// Seconds to wait for post-start hooks after shutdown is requested.
    #[arg(long, default_value_t = 10)]
    pub shutdown_grace_secs: u64,

    /// Log filter directives, e.g. `info,hookserve=debug`. Falls back to `RUST_LOG`.
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Server name used in logs.
    #[arg(long, default_value = "hookserve")]
    pub name: String,
}

impl Options {
    /// The server settings these options describe.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            name: self.name.clone(),
            bind_address: self.bind_address,
            port: self.port,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_request_body_bytes: self.max_request_body_bytes,
            max_in_flight_per_hook: self.max_in_flight_per_hook,
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
        }
    }
}

/// Settings read by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Name used in logs.
    pub name: String,
    /// Listen address.
    pub bind_address: IpAddr,
    /// Listen port.
    pub port: u16,
    /// Per-review hook timeout.
    pub request_timeout: Duration,
    /// Body size limit.
    pub max_request_body_bytes: usize,
    /// Running hook calls allowed per route.
    pub max_in_flight_per_hook: usize,
    /// How long shutdown waits for post-start hooks.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "hookserve".to_string(),
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: 8443,
            request_timeout: Duration::from_secs(60),
            max_request_body_bytes: DEFAULT_MAX_REQUEST_BODY_BYTES,
            max_in_flight_per_hook: DEFAULT_MAX_IN_FLIGHT,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}
